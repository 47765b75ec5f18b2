//! Extractors Crate
//!
//! Pure, synchronous stages of the booking-mail pipeline. Nothing in this
//! crate performs I/O apart from loading a property catalog file.
//!
//! # Stages
//!
//! - `classification`: mail channel / platform classification and the noise filter chain
//! - `booking_email`: body cleaning, date parsing, subject and body heuristics
//! - `reconcile`: merges heuristic, AI and header signals into one candidate
//! - `property_catalog`: alias/code catalog and the property normalizer
//! - `fees`: money sanitizing, commission fields and the date review flag
//!
//! # Example
//!
//! ```rust,ignore
//! use extractors::{HeuristicExtractor, PlatformClassifier, Reconciler};
//!
//! let (channel, platform) = PlatformClassifier::new().classify(&message);
//! let extraction = HeuristicExtractor::new().extract(&message, channel, platform, today);
//! let candidate = Reconciler::new().reconcile(extraction, None, header_date, today)?;
//! ```

pub mod booking_email;
pub mod classification;
pub mod error;
pub mod fees;
pub mod property_catalog;
pub mod reconcile;

// Re-export commonly used types
pub use booking_email::{HeuristicExtraction, HeuristicExtractor, SubjectFields};
pub use classification::{NoiseFilter, PlatformClassifier};
pub use error::ExtractionError;
pub use fees::{sanitize_amount, sanitize_money, FeeCalculator, ReviewThresholds};
pub use property_catalog::{PropertyCatalog, PropertyNormalizer, UNASSIGNED_PROPERTY};
pub use reconcile::{parse_header_date, Reconciler};
