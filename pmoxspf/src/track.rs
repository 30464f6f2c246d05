//! Track : handle sur un élément `<track>`

use crate::namespace::{Mode, NamespaceKind, XSPF_NS};
use crate::resolver;
use crate::tree::{NodeRef, XmlTree};
use crate::{Error, Result};
use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use url::Url;

pub(crate) const TRACK: &str = "track";

/// Un morceau d'une playlist XSPF
///
/// Wrapper minimal autour d'un nœud `<track>` de l'arbre : aucune valeur
/// n'est stockée ici, chaque accesseur relit l'arbre. Deux `Track` sont
/// égaux si et seulement s'ils désignent le même nœud ; deux morceaux aux
/// champs identiques mais portés par des nœuds distincts sont différents.
///
/// Un morceau créé dans un autre arbre (par [`Track::new`]) est transplanté
/// à son ajout dans une `TrackList` : le handle et ses clones désignent alors
/// le nœud déplacé. Le hachage suit ce nœud, si bien qu'un `Track` ne doit
/// pas être ajouté à une liste pendant qu'il sert de clé.
///
/// # Exemples
///
/// ```
/// use pmoxspf::{Track, Xspf};
/// use url::Url;
///
/// let xspf = Xspf::new();
/// let track = Track::new();
/// track.set_location(Some(&Url::parse("file:///music/song_1.ogg")?));
/// track.set_title(Some("Song 1"));
///
/// let list = xspf.track_list()?;
/// list.add(&track)?;
/// assert_eq!(list.get(0)?, track);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Track {
    node: Rc<RefCell<NodeRef>>,
    mode: Mode,
}

impl Track {
    /// Crée un morceau vide dans un arbre privé (mode strict)
    pub fn new() -> Self {
        Self::new_in(&XmlTree::new())
    }

    /// Crée un morceau vide, détaché, dans `tree`
    pub fn new_in(tree: &XmlTree) -> Self {
        Self::wrap(tree.create_element(TRACK, Some(XSPF_NS)), Mode::Strict)
    }

    /// Enveloppe un nœud existant.
    ///
    /// En mode strict le nœud doit s'appeler `track` dans le namespace
    /// canonique ; en mode tolérant seul le nom local est vérifié.
    pub fn from_node(node: NodeRef, mode: Mode) -> Result<Self> {
        let (name, namespace) = node
            .with_element(|e| (e.name.clone(), e.namespace.clone()))
            .unwrap_or_default();

        let canonical =
            NamespaceKind::classify(namespace.as_deref()) == Some(NamespaceKind::Canonical);
        if name != TRACK || (mode.is_strict() && !canonical) {
            return Err(Error::WrongElementName {
                expected: qualified(TRACK, mode),
                actual: qualified_actual(&name, namespace.as_deref()),
            });
        }

        Ok(Self::wrap(node, mode))
    }

    /// Construction sans vérification, pour les nœuds déjà filtrés
    pub(crate) fn wrap(node: NodeRef, mode: Mode) -> Self {
        Self {
            node: Rc::new(RefCell::new(node)),
            mode,
        }
    }

    /// Nœud `<track>` actuellement désigné
    pub fn node(&self) -> NodeRef {
        self.node.borrow().clone()
    }

    /// Redirige ce handle et ses clones vers `node`
    pub(crate) fn retarget(&self, node: NodeRef) {
        *self.node.borrow_mut() = node;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_strict(&self) -> bool {
        self.mode.is_strict()
    }

    /// URI de la ressource à restituer
    pub fn location(&self) -> Result<Option<Url>> {
        resolver::get_uri(&self.node(), "location", self.mode)
    }

    pub fn set_location(&self, value: Option<&Url>) {
        resolver::set_uri(&self.node(), "location", value)
    }

    /// Identifiant canonique du morceau
    pub fn identifier(&self) -> Result<Option<Url>> {
        resolver::get_uri(&self.node(), "identifier", self.mode)
    }

    pub fn set_identifier(&self, value: Option<&Url>) {
        resolver::set_uri(&self.node(), "identifier", value)
    }

    /// Titre lisible
    pub fn title(&self) -> Option<String> {
        resolver::get_string(&self.node(), "title", self.mode)
    }

    pub fn set_title(&self, value: Option<&str>) {
        resolver::set_string(&self.node(), "title", value)
    }

    /// URI d'une image (pochette)
    pub fn image(&self) -> Result<Option<Url>> {
        resolver::get_uri(&self.node(), "image", self.mode)
    }

    pub fn set_image(&self, value: Option<&Url>) {
        resolver::set_uri(&self.node(), "image", value)
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        *self.node.borrow() == *other.node.borrow()
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.borrow().hash(state);
    }
}

/// Nom attendu, pour les messages d'erreur
pub(crate) fn qualified(name: &str, mode: Mode) -> String {
    if mode.is_strict() {
        format!("{{{}}}{}", XSPF_NS, name)
    } else {
        name.to_string()
    }
}

pub(crate) fn qualified_actual(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("{{{}}}{}", ns, name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::XSPF_NS_LEGACY;
    use std::collections::HashSet;

    #[test]
    fn test_new_track_location() {
        let uri = Url::parse("http://www.taoyouh.cn").unwrap();
        let track = Track::new();

        track.set_location(Some(&uri));
        assert_eq!(track.location().unwrap(), Some(uri));

        track.set_location(None);
        assert_eq!(track.location().unwrap(), None);
    }

    #[test]
    fn test_fields() {
        let track = Track::new();
        let image = Url::parse("http://example.com/cover.jpg").unwrap();
        let id = Url::parse("urn:uuid:0b0f8c3a-5a3e-4d0e-9d4e-1a2b3c4d5e6f").unwrap();

        track.set_title(Some("Song"));
        track.set_image(Some(&image));
        track.set_identifier(Some(&id));

        assert_eq!(track.title().as_deref(), Some("Song"));
        assert_eq!(track.image().unwrap(), Some(image));
        assert_eq!(track.identifier().unwrap(), Some(id));
    }

    #[test]
    fn test_from_node_strict() {
        let tree = XmlTree::new();
        let legacy = tree.create_element("track", Some(XSPF_NS_LEGACY));
        match Track::from_node(legacy.clone(), Mode::Strict) {
            Err(Error::WrongElementName { expected, actual }) => {
                assert_eq!(expected, "{http://xspf.org/ns/0/}track");
                assert_eq!(actual, "{http://xspf.org/ns/0}track");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(Track::from_node(legacy, Mode::Lenient).is_ok());
    }

    #[test]
    fn test_from_node_wrong_name() {
        let tree = XmlTree::new();
        let node = tree.create_element("trackList", Some(XSPF_NS));
        assert!(matches!(
            Track::from_node(node, Mode::Lenient),
            Err(Error::WrongElementName { .. })
        ));

        let text = tree.create_text("track");
        assert!(Track::from_node(text, Mode::Lenient).is_err());
    }

    #[test]
    fn test_lenient_field_fallback() {
        let tree = XmlTree::new();
        let node = tree.create_element("track", None);
        let location = tree.create_element("location", None);
        location.set_text("file:///music/song_1.ogg");
        node.append(&location).unwrap();

        let strict = Track::wrap(node.clone(), Mode::Strict);
        let lenient = Track::wrap(node, Mode::Lenient);
        assert_eq!(strict.location().unwrap(), None);
        assert_eq!(
            lenient.location().unwrap().map(String::from),
            Some("file:///music/song_1.ogg".to_string())
        );
        // Identité : le mode ne compte pas
        assert_eq!(strict, lenient);
    }

    #[test]
    fn test_identity() {
        let tree = XmlTree::new();
        let a = Track::new_in(&tree);
        let b = Track::new_in(&tree);
        a.set_title(Some("same"));
        b.set_title(Some("same"));

        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let set: HashSet<Track> = [a.clone(), a.clone(), b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
