//! Analysis backend capability seams.
//!
//! Two backends feed the pipeline: document analysis (OCR) and text analysis
//! (NLP). Real deployments wrap vendor clients behind these traits; the fake
//! implementations run the full pipeline offline.

pub mod fake;
pub mod nlp;
pub mod ocr;

pub use fake::{FakeNlpBackend, FakeOcrBackend};
pub use nlp::{
    truncate_utf8, EntitiesOutput, KeyPhrasesOutput, LanguagesOutput, NlpBackend, SentimentLabel,
    SentimentOutput, SENTIMENT_MAX_BYTES, TEXT_MAX_BYTES,
};
pub use ocr::{Block, BlockType, EntityRole, OcrBackend, OcrOutput, OcrPoll};
