//! The most recently produced output of the user's program, for
//! callers (such as a simulator front end) which offer it for
//! download after the fact.
use super::driver::{assemble, Assembly, AssemblyOptions, FailedAssembly, Role};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArtifactCache {
    binary: Option<Vec<u8>>,
    symbols: Option<String>,
}

impl ArtifactCache {
    #[must_use]
    pub fn new() -> ArtifactCache {
        ArtifactCache::default()
    }

    /// The object file of the last successful primary assembly.
    #[must_use]
    pub fn binary(&self) -> Option<&[u8]> {
        self.binary.as_deref()
    }

    /// The serialized symbol table of the last successful primary
    /// assembly.
    #[must_use]
    pub fn symbols(&self) -> Option<&str> {
        self.symbols.as_deref()
    }

    pub fn clear(&mut self) {
        self.binary = None;
        self.symbols = None;
    }

    fn store(&mut self, assembly: &Assembly) {
        self.binary = Some(assembly.binary().to_be_bytes());
        self.symbols = Some(assembly.symbols().to_string());
    }

    /// Assemble `source_text`.  A primary assembly replaces the
    /// cached artifacts: they are cleared first, and refilled only if
    /// assembly succeeds.  A library assembly leaves them alone.
    ///
    /// # Errors
    ///
    /// As for [`assemble`].
    pub fn assemble(
        &mut self,
        source_text: &str,
        options: &AssemblyOptions,
    ) -> Result<Assembly, FailedAssembly> {
        match options.role {
            Role::Library => assemble(source_text, options),
            Role::Primary => {
                self.clear();
                let result = assemble(source_text, options);
                if let Ok(assembly) = &result {
                    self.store(assembly);
                }
                result
            }
        }
    }
}
