//! Processor strategy selection.
//!
//! Each processor claims one document kind and produces the job plan for it.
//! The registry is built once at startup with a fixed, priority-ordered list;
//! selection walks that list and the first claimant wins.

use crate::config::ProcessingConfig;
use crate::error::PipelineError;
use crate::models::{Document, JobKind};

use super::image::ImageProcessor;
use super::pdf::PdfProcessor;
use super::text::TextProcessor;

/// A strategy that turns one document into a job plan.
pub trait DocumentProcessor: Send + Sync {
    /// Short name for logs and CLI output.
    fn name(&self) -> &'static str;

    /// Selection priority; higher is tried first.
    fn priority(&self) -> i32;

    /// MIME types this processor advertises support for.
    fn supported_mime_types(&self) -> &'static [&'static str];

    /// Whether this processor claims the document.
    fn can_process(&self, document: &Document) -> bool;

    /// The ordered job plan for a claimed document.
    fn plan(&self, document: &Document) -> Vec<JobKind>;
}

/// Description of a registered processor, for diagnostics.
#[derive(Debug, Clone)]
pub struct ProcessorInfo {
    pub name: &'static str,
    pub priority: i32,
    pub supported_mime_types: Vec<&'static str>,
}

/// Immutable, priority-ordered set of processors.
pub struct ProcessorRegistry {
    /// Sorted by descending priority; stable sort keeps registration order
    /// between equal priorities.
    processors: Vec<Box<dyn DocumentProcessor>>,
}

impl ProcessorRegistry {
    /// Build a registry from the given processors.
    pub fn new(mut processors: Vec<Box<dyn DocumentProcessor>>) -> Self {
        processors.sort_by_key(|p| std::cmp::Reverse(p.priority()));
        for p in &processors {
            tracing::debug!(
                processor = p.name(),
                priority = p.priority(),
                supported_types = ?p.supported_mime_types(),
                "registered document processor"
            );
        }
        Self { processors }
    }

    /// The standard strategy set: PDF, image, and plain text.
    pub fn with_defaults(config: &ProcessingConfig) -> Self {
        Self::new(vec![
            Box::new(PdfProcessor::new(config.async_threshold_bytes)),
            Box::new(ImageProcessor),
            Box::new(TextProcessor),
        ])
    }

    /// First processor claiming the document, in priority order.
    pub fn find_processor(&self, document: &Document) -> Option<&dyn DocumentProcessor> {
        let found = self
            .processors
            .iter()
            .find(|p| p.can_process(document))
            .map(|p| p.as_ref());

        match found {
            Some(p) => {
                tracing::info!(
                    document_id = %document.id,
                    processor = p.name(),
                    mime_type = %document.mime_type,
                    "found processor for document"
                );
            }
            None => {
                tracing::warn!(
                    document_id = %document.id,
                    mime_type = %document.mime_type,
                    available_processors = self.processors.len(),
                    "no processor found for document"
                );
            }
        }
        found
    }

    /// Produce the job plan for a document.
    pub fn plan(&self, document: &Document) -> Result<Vec<JobKind>, PipelineError> {
        let processor = self
            .find_processor(document)
            .ok_or_else(|| PipelineError::NoProcessorAvailable(document.mime_type.clone()))?;
        Ok(processor.plan(document))
    }

    /// All advertised MIME types, deduplicated and sorted.
    pub fn supported_mime_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self
            .processors
            .iter()
            .flat_map(|p| p.supported_mime_types().iter().copied())
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    pub fn is_supported(&self, mime_type: &str) -> bool {
        self.processors
            .iter()
            .any(|p| p.supported_mime_types().contains(&mime_type))
    }

    /// Registered processors in selection order, for diagnostics.
    pub fn processor_info(&self) -> Vec<ProcessorInfo> {
        self.processors
            .iter()
            .map(|p| ProcessorInfo {
                name: p.name(),
                priority: p.priority(),
                supported_mime_types: p.supported_mime_types().to_vec(),
            })
            .collect()
    }
}
