pub mod domain;
pub mod ports;

pub use domain::{Annotation, LinkRecord, User, UserCredentials};
pub use ports::{
    AnnotationError, AuthError, CredentialError, CredentialStore, LinkAnnotator, LinkStore,
    StorageError, ValidationError, MIN_PASSWORD_LEN,
};
