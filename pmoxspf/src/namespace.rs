//! Espaces de noms XSPF et mode de résolution (strict / tolérant)

/// Namespace canonique XSPF, le seul écrit par la crate
pub const XSPF_NS: &str = "http://xspf.org/ns/0/";

/// Ancienne graphie sans slash final, acceptée en lecture en mode tolérant
pub const XSPF_NS_LEGACY: &str = "http://xspf.org/ns/0";

/// Classe d'un namespace d'élément vis-à-vis de XSPF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// `http://xspf.org/ns/0/`
    Canonical,
    /// `http://xspf.org/ns/0`
    Legacy,
    /// Aucun namespace
    Empty,
}

impl NamespaceKind {
    /// Classe l'URI de namespace d'un élément.
    ///
    /// Retourne `None` pour un namespace étranger à XSPF : un tel élément
    /// n'est jamais reconnu, quel que soit le mode.
    pub fn classify(namespace: Option<&str>) -> Option<Self> {
        match namespace {
            None | Some("") => Some(NamespaceKind::Empty),
            Some(XSPF_NS) => Some(NamespaceKind::Canonical),
            Some(XSPF_NS_LEGACY) => Some(NamespaceKind::Legacy),
            Some(_) => None,
        }
    }

    /// URI à porter par un élément de cette classe
    pub fn uri(self) -> Option<&'static str> {
        match self {
            NamespaceKind::Canonical => Some(XSPF_NS),
            NamespaceKind::Legacy => Some(XSPF_NS_LEGACY),
            NamespaceKind::Empty => None,
        }
    }
}

const STRICT_NAMESPACES: &[NamespaceKind] = &[NamespaceKind::Canonical];

// Ordre de priorité de la résolution tolérante
const LENIENT_NAMESPACES: &[NamespaceKind] = &[
    NamespaceKind::Canonical,
    NamespaceKind::Legacy,
    NamespaceKind::Empty,
];

// La racine n'est jamais cherchée sans namespace
const LENIENT_ROOT_NAMESPACES: &[NamespaceKind] =
    &[NamespaceKind::Canonical, NamespaceKind::Legacy];

/// Mode de résolution des éléments
///
/// En mode strict seul le namespace canonique est reconnu. En mode tolérant,
/// les variantes héritées (sans slash final, puis sans namespace) sont
/// consultées dans cet ordre si l'élément canonique est absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Strict,
    Lenient,
}

impl Mode {
    pub const fn strict() -> Self {
        Mode::Strict
    }

    pub const fn lenient() -> Self {
        Mode::Lenient
    }

    pub fn from_strict(strict: bool) -> Self {
        if strict { Mode::Strict } else { Mode::Lenient }
    }

    pub fn is_strict(self) -> bool {
        self == Mode::Strict
    }

    /// Namespaces acceptés pour un élément enfant, par ordre de priorité
    pub fn accepted_namespaces(self) -> &'static [NamespaceKind] {
        match self {
            Mode::Strict => STRICT_NAMESPACES,
            Mode::Lenient => LENIENT_NAMESPACES,
        }
    }

    /// Namespaces acceptés pour l'élément racine `playlist`
    pub fn root_namespaces(self) -> &'static [NamespaceKind] {
        match self {
            Mode::Strict => STRICT_NAMESPACES,
            Mode::Lenient => LENIENT_ROOT_NAMESPACES,
        }
    }

    /// Indique si un namespace d'élément est reconnu dans ce mode
    pub fn accepts(self, namespace: Option<&str>) -> bool {
        NamespaceKind::classify(namespace)
            .is_some_and(|kind| self.accepted_namespaces().contains(&kind))
    }
}
