//! Document analysis: processor selection, job execution, and completion.

pub mod completion;
pub mod image;
pub mod nlp_executor;
pub mod ocr_executor;
pub mod pdf;
pub mod pipeline;
pub mod registry;
pub mod text;

pub use completion::CompletionEvaluator;
pub use image::ImageProcessor;
pub use nlp_executor::NlpJobExecutor;
pub use ocr_executor::OcrJobExecutor;
pub use pdf::PdfProcessor;
pub use pipeline::{Pipeline, DISPATCH_MAX_ATTEMPTS};
pub use registry::{DocumentProcessor, ProcessorInfo, ProcessorRegistry};
pub use text::TextProcessor;
