//! Named, ordered lists of processors.

use crate::error::AssemblyError;
use crate::processor::Processor;
use std::fmt;
use std::sync::Arc;

/// A named, ordered list of processors.
///
/// Processor names are unique within an assembly and are how other processors
/// are positioned relative to them.
///
/// ```
/// use ally_design::assembly::Assembly;
/// use ally_design::processor::FnProcessor;
///
/// let mut assembly = Assembly::new("resources");
/// assembly.add(FnProcessor::new("decode", vec![], |_| Ok(()))).unwrap();
/// assembly.add(FnProcessor::new("invoke", vec![], |_| Ok(()))).unwrap();
/// assembly
///     .add_before("invoke", FnProcessor::new("verify", vec![], |_| Ok(())))
///     .unwrap();
///
/// assert_eq!(assembly.names(), ["decode", "verify", "invoke"]);
/// ```
#[derive(Clone)]
pub struct Assembly {
    name: String,
    processors: Vec<Arc<dyn Processor>>,
}

impl Assembly {
    /// Creates an empty assembly.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processors: Vec::new(),
        }
    }

    /// Returns the assembly name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a processor.
    pub fn add(&mut self, processor: impl Processor) -> Result<&mut Self, AssemblyError> {
        self.add_shared(Arc::new(processor))
    }

    /// Appends an already shared processor.
    pub fn add_shared(&mut self, processor: Arc<dyn Processor>) -> Result<&mut Self, AssemblyError> {
        self.check_unique(processor.name())?;
        self.processors.push(processor);
        Ok(self)
    }

    /// Inserts a processor before the processor named `target`.
    pub fn add_before(
        &mut self,
        target: &str,
        processor: impl Processor,
    ) -> Result<&mut Self, AssemblyError> {
        let index = self.position(target)?;
        self.check_unique(processor.name())?;
        self.processors.insert(index, Arc::new(processor));
        Ok(self)
    }

    /// Inserts a processor after the processor named `target`.
    pub fn add_after(
        &mut self,
        target: &str,
        processor: impl Processor,
    ) -> Result<&mut Self, AssemblyError> {
        let index = self.position(target)?;
        self.check_unique(processor.name())?;
        self.processors.insert(index + 1, Arc::new(processor));
        Ok(self)
    }

    /// Replaces the processor named `target`.
    pub fn replace(
        &mut self,
        target: &str,
        processor: impl Processor,
    ) -> Result<&mut Self, AssemblyError> {
        let index = self.position(target)?;
        if processor.name() != target {
            self.check_unique(processor.name())?;
        }
        self.processors[index] = Arc::new(processor);
        Ok(self)
    }

    /// Removes the processor named `target` and returns it.
    pub fn remove(&mut self, target: &str) -> Result<Arc<dyn Processor>, AssemblyError> {
        let index = self.position(target)?;
        Ok(self.processors.remove(index))
    }

    /// Returns true if a processor with the name is part of the assembly.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.processors.iter().any(|p| p.name() == name)
    }

    /// Returns the processors in order.
    #[must_use]
    pub fn processors(&self) -> &[Arc<dyn Processor>] {
        &self.processors
    }

    /// Returns the processor names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Returns the number of processors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Returns true if the assembly has no processors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    fn position(&self, target: &str) -> Result<usize, AssemblyError> {
        self.processors
            .iter()
            .position(|p| p.name() == target)
            .ok_or_else(|| AssemblyError::UnknownProcessor {
                assembly: self.name.clone(),
                processor: target.to_string(),
            })
    }

    fn check_unique(&self, name: &str) -> Result<(), AssemblyError> {
        if self.contains(name) {
            Err(AssemblyError::Duplicate {
                assembly: self.name.clone(),
                processor: name.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembly")
            .field("name", &self.name)
            .field("processors", &self.names())
            .finish()
    }
}
