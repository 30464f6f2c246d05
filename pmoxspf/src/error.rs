//! Types d'erreurs pour pmoxspf

/// Erreurs du modèle XSPF
///
/// Les erreurs structurelles (racine, `trackList`, nom d'élément) sont
/// levées à la construction des vues. Le contenu des champs n'est validé
/// qu'à la lecture de l'accesseur typé correspondant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Root element \"playlist\" not found")]
    MissingRootElement,

    #[error("Required element \"{0}\" is missing in \"playlist\"")]
    MissingRequiredChild(String),

    #[error("Wrong element name: expected \"{expected}\", found \"{actual}\"")]
    WrongElementName { expected: String, actual: String },

    #[error("Value of element \"{field}\" is not a legal URI")]
    NotLegalUri {
        field: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Value of element \"{field}\" is not a legal date: {value:?}")]
    NotLegalDate {
        field: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Index {index} is out of range (count: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Destination buffer is too small: {needed} slots needed, {available} available")]
    ArrayTooSmall { needed: usize, available: usize },

    #[error("Node belongs to another XML tree")]
    ForeignNode,

    #[error("Cannot attach a node under itself or one of its descendants")]
    InvalidHierarchy,

    #[error("Reference node is not attached to a parent")]
    DetachedNode,

    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Emit(#[from] xmltree::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Type Result spécialisé pour pmoxspf
pub type Result<T> = std::result::Result<T, Error>;
