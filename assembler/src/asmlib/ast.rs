//! Representation of one line of the program once its label (if any)
//! has been removed.  It's hardly a tree.
use std::fmt::{self, Display, Formatter};

use super::directive::Directive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Statement {
    Instruction {
        mnemonic: String,
        operands: Vec<String>,
    },
    Directive {
        directive: Directive,
        operands: Vec<String>,
    },
}

impl Statement {
    pub(crate) fn name(&self) -> &str {
        match self {
            Statement::Instruction { mnemonic, .. } => mnemonic.as_str(),
            Statement::Directive { directive, .. } => directive.name(),
        }
    }

    pub(crate) fn operands(&self) -> &[String] {
        match self {
            Statement::Instruction { operands, .. } | Statement::Directive { operands, .. } => {
                operands
            }
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        for (i, operand) in self.operands().iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            f.write_str(operand)?;
        }
        Ok(())
    }
}

#[test]
fn test_statement_display() {
    let stmt = Statement::Instruction {
        mnemonic: "add".to_string(),
        operands: vec!["r0".to_string(), "r1".to_string(), "#2".to_string()],
    };
    assert_eq!(stmt.to_string(), "add r0, r1, #2");
    let end = Statement::Directive {
        directive: Directive::End,
        operands: Vec::new(),
    };
    assert_eq!(end.to_string(), ".end");
}
