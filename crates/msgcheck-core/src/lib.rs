//! MsgCheck Core - Message moderation classification.
//!
//! This crate combines a multi-label toxicity model and a sentiment model
//! into a single moderation [`Label`](classifier::Label) using a fixed
//! threshold cascade.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "ml")]
//! # fn main() -> Result<(), msgcheck_core::classifier::ClassifierError> {
//! use msgcheck_core::classifier::{
//!     MessageClassifier, ModelPaths, OnnxSentimentScorer, OnnxToxicityScorer,
//! };
//!
//! let toxicity = OnnxToxicityScorer::new(ModelPaths::in_dir("models/toxicity"))?;
//! let sentiment = OnnxSentimentScorer::new(ModelPaths::in_dir("models/sentiment"))?;
//! let mut classifier = MessageClassifier::new(Box::new(toxicity), Box::new(sentiment));
//!
//! let label = classifier.classify("have a nice day")?;
//! println!("{}", label);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ml"))]
//! # fn main() {}
//! ```

pub mod classifier;
pub mod model_downloader;

pub use classifier::{ClassifierError, Label, MessageClassifier};
