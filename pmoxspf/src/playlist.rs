//! Xspf : document XSPF et ses métadonnées

use crate::config::{SaveOptions, XspfConfig};
use crate::namespace::{Mode, NamespaceKind, XSPF_NS};
use crate::resolver;
use crate::track::Track;
use crate::track_list::{TRACK_LIST, TrackList};
use crate::tree::{NodeRef, XmlTree, codec};
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use url::Url;

const PLAYLIST: &str = "playlist";
const VERSION: &str = "version";

/// Une playlist XSPF
///
/// Le document possède son arbre ; métadonnées, [`TrackList`] et [`Track`]
/// en sont des vues. Rien n'est mis en cache : chaque lecture reflète l'état
/// courant de l'arbre et chaque écriture le modifie directement.
///
/// Le contenu des champs n'est validé qu'à la lecture de l'accesseur
/// correspondant ; la présence de `playlist` est vérifiée à la construction,
/// celle de `trackList` à l'appel de [`Xspf::track_list`].
///
/// # Exemple
///
/// ```
/// use pmoxspf::Xspf;
///
/// let xspf = Xspf::new();
/// xspf.set_title(Some("Radio Paradise - Main Mix"));
///
/// let track = xspf.create_track();
/// track.set_title(Some("Song"));
/// xspf.track_list()?.add(&track)?;
///
/// let xml = xspf.to_xml_string()?;
/// let reloaded = Xspf::load_from_str(&xml, pmoxspf::Mode::Strict)?;
/// assert_eq!(reloaded.title().as_deref(), Some("Radio Paradise - Main Mix"));
/// assert_eq!(reloaded.track_list()?.count(), 1);
/// # Ok::<(), pmoxspf::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Xspf {
    tree: XmlTree,
    root: NodeRef,
    mode: Mode,
}

macro_rules! string_field {
    ($(#[$doc:meta])* $getter:ident, $setter:ident, $name:expr) => {
        $(#[$doc])*
        pub fn $getter(&self) -> Option<String> {
            resolver::get_string(&self.root, $name, self.mode)
        }

        pub fn $setter(&self, value: Option<&str>) {
            resolver::set_string(&self.root, $name, value)
        }
    };
}

macro_rules! uri_field {
    ($(#[$doc:meta])* $getter:ident, $setter:ident, $name:expr) => {
        $(#[$doc])*
        pub fn $getter(&self) -> Result<Option<Url>> {
            resolver::get_uri(&self.root, $name, self.mode)
        }

        pub fn $setter(&self, value: Option<&Url>) {
            resolver::set_uri(&self.root, $name, value)
        }
    };
}

impl Xspf {
    /// Crée une playlist vide en mode strict
    pub fn new() -> Self {
        Self::with_mode(Mode::Strict)
    }

    /// Crée une playlist vide : `<playlist version="1">` contenant un
    /// `<trackList>` vide, dans le namespace canonique
    pub fn with_mode(mode: Mode) -> Self {
        let tree = XmlTree::new();
        let root = tree.create_element(PLAYLIST, Some(XSPF_NS));
        root.set_attribute(VERSION, "1");
        let track_list = tree.create_element(TRACK_LIST, Some(XSPF_NS));

        // Nœuds neufs du même arbre
        if let Err(e) = tree
            .document()
            .append(&root)
            .and_then(|_| root.append(&track_list))
        {
            tracing::warn!("Cannot build XSPF skeleton: {}", e);
        }

        Self { tree, root, mode }
    }

    /// Lie une playlist à un arbre fourni par le codec, sans copie.
    ///
    /// La racine `playlist` est cherchée parmi les éléments de premier
    /// niveau : namespace canonique, ou hérité en mode tolérant.
    pub fn from_tree(tree: XmlTree, mode: Mode) -> Result<Self> {
        let document = tree.document();
        let root = mode
            .root_namespaces()
            .iter()
            .find_map(|&kind| {
                document.find_child(|e| {
                    e.name == PLAYLIST
                        && NamespaceKind::classify(e.namespace.as_deref()) == Some(kind)
                })
            })
            .ok_or_else(|| {
                tracing::debug!("No <playlist> root element accepted in {:?} mode", mode);
                Error::MissingRootElement
            })?;

        tracing::debug!("Bound XSPF document ({:?} mode)", mode);
        Ok(Self { tree, root, mode })
    }

    /// Lie une playlist à une copie de `root`
    pub fn from_element(root: &xmltree::Element, mode: Mode) -> Result<Self> {
        Self::from_tree(codec::from_element(root)?, mode)
    }

    /// Charge une playlist en mode strict
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        Self::load_with_mode(reader, Mode::Strict)
    }

    pub fn load_with_mode<R: Read>(reader: R, mode: Mode) -> Result<Self> {
        Self::from_tree(codec::parse(reader)?, mode)
    }

    /// Charge une playlist avec le mode de `config`
    pub fn load_with_config<R: Read>(reader: R, config: &XspfConfig) -> Result<Self> {
        Self::load_with_mode(reader, config.mode())
    }

    pub fn load_from_slice(bytes: &[u8], mode: Mode) -> Result<Self> {
        Self::from_tree(codec::parse_slice(bytes)?, mode)
    }

    pub fn load_from_str(xml: &str, mode: Mode) -> Result<Self> {
        Self::load_from_slice(xml.as_bytes(), mode)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Self> {
        tracing::debug!("Loading XSPF playlist from {}", path.as_ref().display());
        let file = File::open(path)?;
        Self::load_with_mode(BufReader::new(file), mode)
    }

    /// Écrit la playlist avec les options par défaut
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        self.save_with_options(writer, &SaveOptions::default())
    }

    pub fn save_with_options<W: Write>(&self, writer: W, options: &SaveOptions) -> Result<()> {
        codec::write(&self.root, writer, options)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        tracing::debug!("Saving XSPF playlist to {}", path.as_ref().display());
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_with_options(&mut writer, options)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Élément racine `playlist`
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_strict(&self) -> bool {
        self.mode.is_strict()
    }

    /// Valeur de l'attribut `version` de la racine
    pub fn version(&self) -> Option<String> {
        self.root.attribute(VERSION)
    }

    /// Crée un morceau vide, détaché, dans l'arbre de ce document
    pub fn create_track(&self) -> Track {
        Track::new_in(&self.tree)
    }

    /// Crée une liste vide, détachée, dans l'arbre de ce document
    pub fn create_track_list(&self) -> TrackList {
        TrackList::new_in(&self.tree, self.mode)
    }

    string_field!(
        /// Titre lisible de la playlist
        title,
        set_title,
        "title"
    );

    string_field!(
        /// Auteur de la playlist
        creator,
        set_creator,
        "creator"
    );

    string_field!(
        /// Commentaire lisible
        annotation,
        set_annotation,
        "annotation"
    );

    uri_field!(
        /// Page web décrivant la playlist
        info,
        set_info,
        "info"
    );

    uri_field!(
        /// URI source de la playlist
        location,
        set_location,
        "location"
    );

    uri_field!(
        /// Identifiant canonique
        identifier,
        set_identifier,
        "identifier"
    );

    uri_field!(
        /// Image affichée à défaut d'image de morceau
        image,
        set_image,
        "image"
    );

    uri_field!(
        /// Licence de la playlist
        license,
        set_license,
        "license"
    );

    /// Date de création
    pub fn date(&self) -> Result<Option<DateTime<FixedOffset>>> {
        resolver::get_date(&self.root, "date", self.mode)
    }

    pub fn set_date(&self, value: Option<&DateTime<FixedOffset>>) {
        resolver::set_date(&self.root, "date", value)
    }

    /// Liste des morceaux
    pub fn track_list(&self) -> Result<TrackList> {
        let node = resolver::find(&self.root, TRACK_LIST, self.mode)
            .ok_or_else(|| Error::MissingRequiredChild(TRACK_LIST.to_string()))?;
        TrackList::from_node(node, self.mode)
    }

    /// Remplace la liste des morceaux.
    ///
    /// Les `<trackList>` existants (de tout namespace accepté) sont détachés
    /// et le nœud de `track_list` devient l'enfant `trackList` de la racine.
    /// Une liste venant d'un autre arbre y est transplantée.
    pub fn set_track_list(&self, track_list: TrackList) -> Result<()> {
        let existing = self.root.child_elements_where(|e| {
            e.name == TRACK_LIST
                && NamespaceKind::classify(e.namespace.as_deref()).is_some()
        });
        for node in existing {
            if &node != track_list.node() {
                node.detach();
            }
        }

        let node = self.tree.transplant(track_list.node());
        self.root.append(&node)
    }
}

impl Default for Xspf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::XSPF_NS_LEGACY;

    #[test]
    fn test_new_skeleton() {
        let xspf = Xspf::new();
        assert_eq!(xspf.version().as_deref(), Some("1"));
        assert_eq!(xspf.root().namespace().as_deref(), Some(XSPF_NS));
        assert_eq!(xspf.track_list().unwrap().count(), 0);
        assert!(xspf.is_strict());
    }

    #[test]
    fn test_missing_root() {
        let tree = XmlTree::new();
        let root = tree.create_element("playlist", None);
        tree.document().append(&root).unwrap();

        assert!(matches!(
            Xspf::from_tree(tree.clone(), Mode::Strict),
            Err(Error::MissingRootElement)
        ));
        // Jamais de racine sans namespace, même en mode tolérant
        assert!(matches!(
            Xspf::from_tree(tree, Mode::Lenient),
            Err(Error::MissingRootElement)
        ));
    }

    #[test]
    fn test_legacy_root_lenient() {
        let tree = XmlTree::new();
        let root = tree.create_element("playlist", Some(XSPF_NS_LEGACY));
        tree.document().append(&root).unwrap();

        assert!(Xspf::from_tree(tree.clone(), Mode::Strict).is_err());
        let xspf = Xspf::from_tree(tree, Mode::Lenient).unwrap();
        assert_eq!(xspf.root(), &root);
    }

    #[test]
    fn test_missing_track_list() {
        let xspf = Xspf::new();
        xspf.track_list().unwrap().node().detach();

        match xspf.track_list() {
            Err(Error::MissingRequiredChild(name)) => assert_eq!(name, "trackList"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_set_track_list_same_tree() {
        let xspf = Xspf::new();
        let old = xspf.track_list().unwrap();
        let list = xspf.create_track_list();
        let track = xspf.create_track();
        list.add(&track).unwrap();

        xspf.set_track_list(list.clone()).unwrap();

        let current = xspf.track_list().unwrap();
        assert_eq!(current, list);
        assert_ne!(current, old);
        assert_eq!(current.get(0).unwrap(), track);
        assert_eq!(old.node().parent(), None);
    }

    #[test]
    fn test_set_track_list_transplant() {
        let xspf = Xspf::new();
        let list = TrackList::new(Mode::Strict);
        let track = Track::new_in(list.tree());
        track.set_title(Some("Moved"));
        list.add(&track).unwrap();

        xspf.set_track_list(list).unwrap();

        let current = xspf.track_list().unwrap();
        assert!(current.node().tree().ptr_eq(xspf.tree()));
        assert_eq!(current.count(), 1);
        assert_eq!(current.get(0).unwrap().title().as_deref(), Some("Moved"));
        assert_eq!(
            xspf.root()
                .child_elements_where(|e| e.name == "trackList")
                .len(),
            1
        );
    }

    #[test]
    fn test_date_field() {
        let xspf = Xspf::new();
        let date = DateTime::parse_from_rfc3339("2005-01-08T17:10:47-05:00").unwrap();
        xspf.set_date(Some(&date));
        assert_eq!(xspf.date().unwrap(), Some(date));
        xspf.set_date(None);
        assert_eq!(xspf.date().unwrap(), None);
    }
}
