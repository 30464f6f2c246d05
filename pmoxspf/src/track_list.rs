//! TrackList : vue ordonnée et vivante sur les `<track>` d'un `<trackList>`
//!
//! La liste n'est pas une copie : c'est la sous-suite des enfants du
//! conteneur dont le nom local est `track` et dont le namespace est accepté
//! par le mode. Aucun index n'est conservé ; chaque opération positionnelle
//! reparcourt les enfants (O(n)) et reflète donc toujours l'état courant de
//! l'arbre, y compris les modifications faites par un autre chemin.

use crate::namespace::{Mode, NamespaceKind, XSPF_NS};
use crate::track::{self, TRACK, Track};
use crate::tree::{NodeRef, XmlTree};
use crate::{Error, Result};
use std::hash::{Hash, Hasher};

pub(crate) const TRACK_LIST: &str = "trackList";

/// Liste ordonnée des morceaux d'une playlist
///
/// Les positions sont celles des éléments `<track>` reconnus, dans l'ordre
/// du document ; les autres enfants du conteneur (commentaires, éléments
/// étrangers, `<track>` d'un namespace refusé) sont ignorés et préservés.
///
/// Un morceau déjà présent dans l'arbre de la liste est déplacé, pas copié.
/// Un morceau d'un autre arbre y est transplanté : il quitte son arbre
/// d'origine et le `Track` passé en argument désigne désormais la copie.
#[derive(Debug, Clone)]
pub struct TrackList {
    node: NodeRef,
    mode: Mode,
}

impl TrackList {
    /// Crée une liste vide dans un arbre privé, à confier ensuite à
    /// `Xspf::set_track_list`
    pub fn new(mode: Mode) -> Self {
        Self::new_in(&XmlTree::new(), mode)
    }

    /// Crée une liste vide, détachée, dans `tree`
    pub fn new_in(tree: &XmlTree, mode: Mode) -> Self {
        Self {
            node: tree.create_element(TRACK_LIST, Some(XSPF_NS)),
            mode,
        }
    }

    /// Enveloppe un conteneur existant.
    ///
    /// Le nom local doit être `trackList` ; en mode strict le namespace
    /// doit en plus être canonique.
    pub fn from_node(node: NodeRef, mode: Mode) -> Result<Self> {
        let (name, namespace) = node
            .with_element(|e| (e.name.clone(), e.namespace.clone()))
            .unwrap_or_default();

        let canonical =
            NamespaceKind::classify(namespace.as_deref()) == Some(NamespaceKind::Canonical);
        if name != TRACK_LIST || (mode.is_strict() && !canonical) {
            return Err(Error::WrongElementName {
                expected: track::qualified(TRACK_LIST, mode),
                actual: track::qualified_actual(&name, namespace.as_deref()),
            });
        }

        Ok(Self { node, mode })
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// Arbre portant la liste
    pub fn tree(&self) -> &XmlTree {
        self.node.tree()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_strict(&self) -> bool {
        self.mode.is_strict()
    }

    fn matching(&self) -> Vec<NodeRef> {
        let mode = self.mode;
        self.node
            .child_elements_where(|e| e.name == TRACK && mode.accepts(e.namespace.as_deref()))
    }

    fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange { index, len })
        }
    }

    /// Nœud de `track` dans l'arbre de la liste, après transplantation si
    /// le morceau vient d'un autre arbre
    fn adopt(&self, track: &Track) -> NodeRef {
        let node = track.node();
        if node.same_tree(&self.node) {
            return node;
        }

        let moved = self.node.tree().transplant(&node);
        track.retarget(moved.clone());
        tracing::debug!("Track list: adopted track from another tree");
        moved
    }

    /// Nombre de morceaux reconnus
    pub fn count(&self) -> usize {
        self.matching().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Morceau en position `index`
    pub fn get(&self, index: usize) -> Result<Track> {
        let mut matching = self.matching();
        Self::check_index(index, matching.len())?;
        Ok(Track::wrap(matching.swap_remove(index), self.mode))
    }

    /// Remplace le morceau en position `index` par `track`
    pub fn set(&self, index: usize, track: &Track) -> Result<()> {
        let matching = self.matching();
        Self::check_index(index, matching.len())?;
        let node = self.adopt(track);

        let old = &matching[index];
        if *old == node {
            return Ok(());
        }

        old.detach();
        if index == 0 {
            self.node.prepend(&node)?;
        } else {
            matching[index - 1].insert_after(&node)?;
        }
        tracing::trace!("Track list: set {}", index);
        Ok(())
    }

    /// Insère `track` pour qu'il devienne le morceau en position `index`.
    ///
    /// `index` peut valoir [`count`](Self::count) : le morceau est alors
    /// placé juste après le dernier morceau reconnu.
    pub fn insert(&self, index: usize, track: &Track) -> Result<()> {
        let matching = self.matching();
        if index > matching.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: matching.len(),
            });
        }
        let node = self.adopt(track);

        if index == 0 {
            self.node.prepend(&node)?;
        } else {
            matching[index - 1].insert_after(&node)?;
        }
        tracing::trace!("Track list: insert at {}", index);
        Ok(())
    }

    /// Supprime le morceau en position `index`
    pub fn remove_at(&self, index: usize) -> Result<()> {
        let matching = self.matching();
        Self::check_index(index, matching.len())?;
        matching[index].detach();
        tracing::trace!("Track list: remove at {}", index);
        Ok(())
    }

    /// Ajoute `track` en dernier enfant du conteneur.
    ///
    /// L'ajout est structurel : si des enfants non reconnus suivent le
    /// dernier morceau, `track` est placé après eux.
    pub fn add(&self, track: &Track) -> Result<()> {
        let node = self.adopt(track);
        self.node.append(&node)?;
        tracing::trace!("Track list: add");
        Ok(())
    }

    /// Position de `track` (comparaison par identité)
    pub fn index_of(&self, track: &Track) -> Option<usize> {
        let target = track.node();
        self.matching().iter().position(|node| *node == target)
    }

    pub fn contains(&self, track: &Track) -> bool {
        self.index_of(track).is_some()
    }

    /// Retire `track` s'il fait partie de la liste
    pub fn remove(&self, track: &Track) -> bool {
        let target = track.node();
        match self.matching().into_iter().find(|node| *node == target) {
            Some(node) => {
                node.detach();
                tracing::trace!("Track list: remove");
                true
            }
            None => false,
        }
    }

    /// Retire tous les morceaux reconnus ; les autres enfants restent
    pub fn clear(&self) {
        let matching = self.matching();
        tracing::trace!("Track list: clear {} track(s)", matching.len());
        for node in matching {
            node.detach();
        }
    }

    /// Copie les morceaux dans `buffer` à partir de `offset`.
    ///
    /// Si la place manque, les morceaux qui tiennent sont écrits avant que
    /// [`Error::ArrayTooSmall`] ne soit retournée.
    pub fn copy_to(&self, buffer: &mut [Option<Track>], offset: usize) -> Result<()> {
        let matching = self.matching();
        // Un décalage démesuré sature plutôt que de déborder
        let needed = offset.saturating_add(matching.len());
        let available = buffer.len();

        for (i, node) in matching.into_iter().enumerate() {
            match offset.checked_add(i).and_then(|slot| buffer.get_mut(slot)) {
                Some(entry) => *entry = Some(Track::wrap(node, self.mode)),
                None => {
                    return Err(Error::ArrayTooSmall { needed, available });
                }
            }
        }
        Ok(())
    }

    /// Parcourt les morceaux.
    ///
    /// L'ensemble des morceaux est figé au début du parcours ; modifier la
    /// liste pendant le parcours donne un résultat non spécifié. Rappeler
    /// `iter` reprend l'état courant.
    pub fn iter(&self) -> Iter {
        Iter {
            nodes: self.matching().into_iter(),
            mode: self.mode,
        }
    }
}

impl PartialEq for TrackList {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for TrackList {}

impl Hash for TrackList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

/// Itérateur sur les morceaux d'une [`TrackList`]
#[derive(Debug)]
pub struct Iter {
    nodes: std::vec::IntoIter<NodeRef>,
    mode: Mode,
}

impl Iterator for Iter {
    type Item = Track;

    fn next(&mut self) -> Option<Self::Item> {
        self.nodes.next().map(|node| Track::wrap(node, self.mode))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl ExactSizeIterator for Iter {}

impl IntoIterator for &TrackList {
    type Item = Track;
    type IntoIter = Iter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::XSPF_NS_LEGACY;

    fn list_with(tree: &XmlTree, n: usize) -> (TrackList, Vec<Track>) {
        let list = TrackList::new_in(tree, Mode::Strict);
        let tracks: Vec<Track> = (0..n)
            .map(|i| {
                let track = Track::new_in(tree);
                track.set_title(Some(&format!("Track {}", i)));
                list.add(&track).unwrap();
                track
            })
            .collect();
        (list, tracks)
    }

    fn titles(list: &TrackList) -> Vec<String> {
        list.iter().filter_map(|t| t.title()).collect()
    }

    #[test]
    fn test_from_node_checks() {
        let tree = XmlTree::new();
        let legacy = tree.create_element("trackList", Some(XSPF_NS_LEGACY));
        assert!(TrackList::from_node(legacy.clone(), Mode::Strict).is_err());
        assert!(TrackList::from_node(legacy, Mode::Lenient).is_ok());

        let wrong = tree.create_element("track", Some(XSPF_NS));
        match TrackList::from_node(wrong, Mode::Lenient) {
            Err(Error::WrongElementName { expected, actual }) => {
                assert_eq!(expected, "trackList");
                assert_eq!(actual, "{http://xspf.org/ns/0/}track");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_set() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 3);
        let replacement = Track::new_in(&tree);
        replacement.set_title(Some("New"));

        list.set(1, &replacement).unwrap();
        assert_eq!(titles(&list), vec!["Track 0", "New", "Track 2"]);
        assert!(!list.contains(&tracks[1]));

        let first = Track::new_in(&tree);
        first.set_title(Some("First"));
        list.set(0, &first).unwrap();
        assert_eq!(titles(&list), vec!["First", "New", "Track 2"]);
        assert_eq!(list.count(), 3);

        assert!(matches!(
            list.set(3, &first),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_set_same_track_is_noop() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 2);
        list.set(1, &tracks[1]).unwrap();
        assert_eq!(list.index_of(&tracks[1]), Some(1));
        assert_eq!(list.count(), 2);
    }

    #[test]
    fn test_insert_bounds() {
        let tree = XmlTree::new();
        let (list, _) = list_with(&tree, 2);

        let last = Track::new_in(&tree);
        last.set_title(Some("Last"));
        list.insert(2, &last).unwrap();
        assert_eq!(list.index_of(&last), Some(2));

        let beyond = Track::new_in(&tree);
        assert!(matches!(
            list.insert(4, &beyond),
            Err(Error::IndexOutOfRange { index: 4, len: 3 })
        ));
    }

    #[test]
    fn test_insert_into_empty() {
        let tree = XmlTree::new();
        let list = TrackList::new_in(&tree, Mode::Strict);
        let track = Track::new_in(&tree);
        list.insert(0, &track).unwrap();
        assert_eq!(list.get(0).unwrap(), track);
    }

    #[test]
    fn test_remove_at() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 3);
        list.remove_at(0).unwrap();
        assert_eq!(list.get(0).unwrap(), tracks[1]);
        assert!(list.remove_at(2).is_err());
    }

    #[test]
    fn test_non_matching_children_are_skipped() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 2);
        let comment = tree.create_comment("keep me");
        let foreign = tree.create_element("track", Some("urn:other"));
        let legacy = tree.create_element("track", Some(XSPF_NS_LEGACY));
        list.node().prepend(&comment).unwrap();
        tracks[0].node().insert_after(&foreign).unwrap();
        list.node().append(&legacy).unwrap();

        assert_eq!(list.count(), 2);
        assert_eq!(list.get(1).unwrap(), tracks[1]);

        // La liste tolérante voit le <track> hérité
        let lenient = TrackList::from_node(list.node().clone(), Mode::Lenient).unwrap();
        assert_eq!(lenient.count(), 3);

        list.clear();
        assert_eq!(list.count(), 0);
        assert_eq!(list.node().children().len(), 3);
        assert_eq!(lenient.count(), 1);
    }

    #[test]
    fn test_add_is_structural() {
        let tree = XmlTree::new();
        let (list, _) = list_with(&tree, 1);
        let extension = tree.create_element("extension", Some(XSPF_NS));
        list.node().append(&extension).unwrap();

        let track = Track::new_in(&tree);
        list.add(&track).unwrap();
        assert_eq!(list.index_of(&track), Some(1));
        assert_eq!(list.node().children().last().cloned(), Some(track.node()));
    }

    #[test]
    fn test_standalone_track_is_adopted() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 1);

        let added = Track::new();
        added.set_title(Some("Added"));
        let alias = added.clone();
        assert!(!list.contains(&added));

        list.add(&added).unwrap();
        assert!(added.node().tree().ptr_eq(&tree));
        assert_eq!(list.get(1).unwrap(), added);
        assert_eq!(list.get(1).unwrap(), alias);
        assert_eq!(added.title().as_deref(), Some("Added"));

        let inserted = Track::new();
        list.insert(0, &inserted).unwrap();
        assert_eq!(list.index_of(&inserted), Some(0));

        let replacement = Track::new();
        list.set(1, &replacement).unwrap();
        assert_eq!(list.get(1).unwrap(), replacement);
        assert!(!list.contains(&tracks[0]));
        assert_eq!(list.count(), 3);

        assert!(list.remove(&added));
        assert_eq!(list.count(), 2);
    }

    #[test]
    fn test_index_error_leaves_track_untouched() {
        let tree = XmlTree::new();
        let (list, _) = list_with(&tree, 1);
        let outside = Track::new();
        let origin = outside.node().tree().clone();

        assert!(list.insert(5, &outside).is_err());
        assert!(list.set(5, &outside).is_err());
        assert!(outside.node().tree().ptr_eq(&origin));
    }

    #[test]
    fn test_copy_to() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 3);

        let mut buffer: Vec<Option<Track>> = vec![None; 4];
        list.copy_to(&mut buffer, 1).unwrap();
        assert!(buffer[0].is_none());
        assert_eq!(buffer[1].as_ref(), Some(&tracks[0]));
        assert_eq!(buffer[3].as_ref(), Some(&tracks[2]));

        let mut small: Vec<Option<Track>> = vec![None; 3];
        match list.copy_to(&mut small, 1) {
            Err(Error::ArrayTooSmall { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // Écriture partielle conservée
        assert_eq!(small[1].as_ref(), Some(&tracks[0]));
        assert_eq!(small[2].as_ref(), Some(&tracks[1]));
    }

    #[test]
    fn test_copy_to_huge_offset() {
        let tree = XmlTree::new();
        let (list, _) = list_with(&tree, 1);

        let mut buffer: Vec<Option<Track>> = vec![None; 2];
        match list.copy_to(&mut buffer, usize::MAX) {
            Err(Error::ArrayTooSmall { needed, available }) => {
                assert_eq!(needed, usize::MAX);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(buffer.iter().all(Option::is_none));

        // Liste vide : rien à écrire
        let empty = TrackList::new_in(&tree, Mode::Strict);
        assert!(empty.copy_to(&mut buffer, usize::MAX).is_ok());
    }

    #[test]
    fn test_iter_snapshot() {
        let tree = XmlTree::new();
        let (list, tracks) = list_with(&tree, 2);

        let iter = list.iter();
        assert_eq!(iter.len(), 2);
        list.add(&Track::new_in(&tree)).unwrap();
        assert_eq!(iter.count(), 2);

        let collected: Vec<Track> = (&list).into_iter().collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0], tracks[0]);
    }
}
