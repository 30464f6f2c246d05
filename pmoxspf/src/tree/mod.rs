//! Arbre XML en arène partagée
//!
//! Les nœuds vivent dans une arène (`Vec`) et sont désignés par un
//! [`NodeId`]. Une [`XmlTree`] est un handle partagé (`Rc<RefCell<_>>`) sur
//! cette arène ; un [`NodeRef`] associe un arbre et un identifiant. Les vues
//! XSPF (`Xspf`, `Track`, `TrackList`) ne sont que des `NodeRef` : elles ne
//! stockent rien et relisent l'arbre à chaque appel.
//!
//! Un nœud détaché reste dans l'arène jusqu'à la destruction de l'arbre, si
//! bien qu'un handle ne devient jamais invalide : il désigne simplement un
//! nœud orphelin.
//!
//! L'arbre n'est pas thread-safe (`!Send`, `!Sync`) : un accès concurrent
//! exige une exclusion mutuelle externe.

pub mod codec;

use crate::{Error, Result};
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Identifiant d'un nœud (index dans l'arène)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Nœud document, parent des éléments de premier niveau
    pub const DOCUMENT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Contenu d'un nœud
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Données propres à un élément
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Nom local, sans préfixe
    pub name: String,
    /// URI du namespace (`None` si aucun)
    pub namespace: Option<String>,
    /// Attributs, dans l'ordre d'insertion
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str, namespace: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug)]
struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
    }

    /// `ancestor` est-il `node` lui-même ou l'un de ses ancêtres ?
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Insère `child` sous `parent` à la position calculée par `position`
    /// une fois `child` détaché de son ancien parent.
    fn attach<F>(&mut self, parent: NodeId, child: NodeId, position: F) -> Result<()>
    where
        F: FnOnce(&[NodeId]) -> usize,
    {
        if child == NodeId::DOCUMENT || self.is_ancestor_or_self(child, parent) {
            tracing::warn!(
                "Refusing to attach node {:?} under {:?}: would create a cycle",
                child,
                parent
            );
            return Err(Error::InvalidHierarchy);
        }

        self.detach(child);
        let siblings = &self.node(parent).children;
        let index = position(siblings).min(siblings.len());
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    fn text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => buf.push_str(text),
            NodeData::Comment(_) => {}
            NodeData::Document | NodeData::Element(_) => {
                for child in &self.node(id).children {
                    self.text(*child, buf);
                }
            }
        }
    }

    fn set_text(&mut self, id: NodeId, text: &str) {
        // Un unique enfant texte est réécrit sur place
        if let [only] = self.node(id).children[..] {
            if !text.is_empty() {
                if let NodeData::Text(existing) = &mut self.node_mut(only).data {
                    existing.clear();
                    existing.push_str(text);
                    return;
                }
            }
        }

        let old_children = std::mem::take(&mut self.node_mut(id).children);
        for child in old_children {
            self.node_mut(child).parent = None;
        }
        if !text.is_empty() {
            let text_node = self.push(NodeData::Text(text.to_string()));
            self.node_mut(text_node).parent = Some(id);
            self.node_mut(id).children.push(text_node);
        }
    }

    /// Copie profonde du sous-arbre `id` de `source` dans cette arène.
    /// La copie est détachée.
    fn import(&mut self, source: &Arena, id: NodeId) -> NodeId {
        let source_node = source.node(id);
        let copy = self.push(source_node.data.clone());
        for child in &source_node.children {
            let child_copy = self.import(source, *child);
            self.node_mut(child_copy).parent = Some(copy);
            self.node_mut(copy).children.push(child_copy);
        }
        copy
    }
}

/// Handle partagé sur une arène de nœuds XML
///
/// Cloner une `XmlTree` ne copie pas l'arbre : les deux handles désignent
/// la même arène.
#[derive(Clone)]
pub struct XmlTree {
    arena: Rc<RefCell<Arena>>,
}

impl XmlTree {
    /// Crée un arbre ne contenant que le nœud document
    pub fn new() -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::new())),
        }
    }

    /// Nœud document (parent de l'élément racine)
    pub fn document(&self) -> NodeRef {
        self.node_ref(NodeId::DOCUMENT)
    }

    /// Crée un élément détaché
    pub fn create_element(&self, name: &str, namespace: Option<&str>) -> NodeRef {
        let id = self
            .arena
            .borrow_mut()
            .push(NodeData::Element(ElementData::new(name, namespace)));
        self.node_ref(id)
    }

    /// Crée un nœud texte détaché
    pub fn create_text(&self, text: &str) -> NodeRef {
        let id = self
            .arena
            .borrow_mut()
            .push(NodeData::Text(text.to_string()));
        self.node_ref(id)
    }

    /// Crée un commentaire détaché
    pub fn create_comment(&self, text: &str) -> NodeRef {
        let id = self
            .arena
            .borrow_mut()
            .push(NodeData::Comment(text.to_string()));
        self.node_ref(id)
    }

    /// Copie le sous-arbre de `node` (qui peut vivre dans un autre arbre)
    /// dans cet arbre, puis détache l'original.
    ///
    /// Les handles sur l'original désignent désormais un nœud orphelin.
    pub fn transplant(&self, node: &NodeRef) -> NodeRef {
        if node.tree.ptr_eq(self) {
            return node.clone();
        }

        let copy = {
            let source = node.tree.arena.borrow();
            self.arena.borrow_mut().import(&source, node.id)
        };
        node.tree.arena.borrow_mut().detach(node.id);
        tracing::debug!("Transplanted node {:?} as {:?}", node.id, copy);
        self.node_ref(copy)
    }

    /// Nombre de nœuds alloués, orphelins compris
    pub fn len(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    /// Toujours faux : le nœud document est présent dès la création
    pub fn is_empty(&self) -> bool {
        self.arena.borrow().nodes.is_empty()
    }

    /// Les deux handles désignent-ils la même arène ?
    pub fn ptr_eq(&self, other: &XmlTree) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }

    fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef {
            tree: self.clone(),
            id,
        }
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for XmlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlTree")
            .field("nodes", &self.len())
            .finish()
    }
}

/// Référence vers un nœud d'une [`XmlTree`]
///
/// L'égalité et le hachage reposent sur l'identité (même arbre, même
/// identifiant), jamais sur le contenu.
#[derive(Clone)]
pub struct NodeRef {
    tree: XmlTree,
    id: NodeId,
}

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    pub fn same_tree(&self, other: &NodeRef) -> bool {
        self.tree.ptr_eq(&other.tree)
    }

    /// Copie du contenu du nœud
    pub fn data(&self) -> NodeData {
        self.tree.arena.borrow().node(self.id).data.clone()
    }

    pub fn is_element(&self) -> bool {
        matches!(
            self.tree.arena.borrow().node(self.id).data,
            NodeData::Element(_)
        )
    }

    /// Applique `f` aux données d'élément, `None` si le nœud n'est pas un
    /// élément. `f` ne doit pas toucher à l'arbre.
    pub(crate) fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        match &self.tree.arena.borrow().node(self.id).data {
            NodeData::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    pub fn local_name(&self) -> Option<String> {
        self.with_element(|e| e.name.clone())
    }

    pub fn namespace(&self) -> Option<String> {
        self.with_element(|e| e.namespace.clone()).flatten()
    }

    pub fn parent(&self) -> Option<NodeRef> {
        let parent = self.tree.arena.borrow().node(self.id).parent;
        parent.map(|id| self.tree.node_ref(id))
    }

    /// Instantané des enfants, dans l'ordre du document
    pub fn children(&self) -> Vec<NodeRef> {
        let ids = self.tree.arena.borrow().node(self.id).children.clone();
        ids.into_iter().map(|id| self.tree.node_ref(id)).collect()
    }

    /// Instantané des enfants éléments satisfaisant `predicate`
    pub fn child_elements_where<F>(&self, predicate: F) -> Vec<NodeRef>
    where
        F: Fn(&ElementData) -> bool,
    {
        let arena = self.tree.arena.borrow();
        let matching: Vec<NodeId> = arena
            .node(self.id)
            .children
            .iter()
            .copied()
            .filter(|id| match &arena.node(*id).data {
                NodeData::Element(element) => predicate(element),
                _ => false,
            })
            .collect();
        drop(arena);
        matching
            .into_iter()
            .map(|id| self.tree.node_ref(id))
            .collect()
    }

    /// Premier enfant élément satisfaisant `predicate`
    pub fn find_child<F>(&self, predicate: F) -> Option<NodeRef>
    where
        F: Fn(&ElementData) -> bool,
    {
        let arena = self.tree.arena.borrow();
        let found = arena
            .node(self.id)
            .children
            .iter()
            .copied()
            .find(|id| match &arena.node(*id).data {
                NodeData::Element(element) => predicate(element),
                _ => false,
            });
        drop(arena);
        found.map(|id| self.tree.node_ref(id))
    }

    /// Concaténation des textes descendants
    pub fn text(&self) -> String {
        let mut buf = String::new();
        self.tree.arena.borrow().text(self.id, &mut buf);
        buf
    }

    /// Remplace tout le contenu du nœud par un unique nœud texte
    pub fn set_text(&self, text: &str) {
        self.tree.arena.borrow_mut().set_text(self.id, text);
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_element(|e| {
            e.attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        })
        .flatten()
    }

    /// Crée ou remplace un attribut. Sans effet sur un nœud non élément.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut arena = self.tree.arena.borrow_mut();
        if let NodeData::Element(element) = &mut arena.node_mut(self.id).data {
            match element.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => element
                    .attributes
                    .push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Ajoute `child` en dernier enfant (en le détachant de son parent).
    ///
    /// Attacher un nœud sous lui-même ou sous un de ses descendants
    /// retourne [`Error::InvalidHierarchy`] sans rien modifier.
    pub fn append(&self, child: &NodeRef) -> Result<()> {
        self.check_same_tree(child)?;
        self.tree
            .arena
            .borrow_mut()
            .attach(self.id, child.id, |siblings| siblings.len())
    }

    /// Ajoute `child` en premier enfant (en le détachant de son parent)
    pub fn prepend(&self, child: &NodeRef) -> Result<()> {
        self.check_same_tree(child)?;
        self.tree
            .arena
            .borrow_mut()
            .attach(self.id, child.id, |_| 0)
    }

    /// Insère `sibling` juste après ce nœud.
    ///
    /// Retourne [`Error::DetachedNode`] si ce nœud n'a pas de parent.
    pub fn insert_after(&self, sibling: &NodeRef) -> Result<()> {
        self.check_same_tree(sibling)?;
        if sibling.id == self.id {
            return Ok(());
        }

        let Some(parent) = self.tree.arena.borrow().node(self.id).parent else {
            tracing::warn!("insert_after on detached node {:?}", self.id);
            return Err(Error::DetachedNode);
        };
        let anchor = self.id;
        self.tree
            .arena
            .borrow_mut()
            .attach(parent, sibling.id, |siblings| {
                siblings
                    .iter()
                    .position(|id| *id == anchor)
                    .map_or(siblings.len(), |index| index + 1)
            })
    }

    /// Détache le nœud de son parent. Le nœud reste dans l'arène.
    pub fn detach(&self) {
        self.tree.arena.borrow_mut().detach(self.id);
    }

    fn check_same_tree(&self, other: &NodeRef) -> Result<()> {
        if self.same_tree(other) {
            Ok(())
        } else {
            Err(Error::ForeignNode)
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.same_tree(other)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.tree.arena) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("NodeRef");
        debug.field("id", &self.id);
        if let Some(name) = self.local_name() {
            debug.field("name", &name);
        }
        debug.finish()
    }
}
