//! Statement classification port
//!
//! Defines the interface for turning the raw bytes of a bank statement into
//! categorized transaction candidates. The HTTP adapter talks to the remote
//! classification API; tests substitute their own implementations.

use crate::domain::result::ImportError;
use crate::domain::ClassifiedStatement;

/// Statement classifier trait
pub trait StatementClassifier: Send + Sync {
    /// Classifier name (e.g., "classify-api")
    fn name(&self) -> &str;

    /// Classify one statement
    ///
    /// # Arguments
    /// * `file_bytes` - Full contents of the statement file
    /// * `filename` - Name reported to the classifier
    fn classify(&self, file_bytes: &[u8], filename: &str) -> Result<ClassifiedStatement, ImportError>;
}
