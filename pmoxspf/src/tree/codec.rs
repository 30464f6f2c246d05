//! Passerelle entre l'arène et le codec XML (`xmltree`)
//!
//! Le décodage et l'encodage des octets restent entièrement à la charge de
//! `xmltree` ; ce module ne fait que convertir `xmltree::Element` vers
//! [`XmlTree`] et inversement.

use super::{NodeData, NodeRef, XmlTree};
use crate::config::SaveOptions;
use crate::namespace::NamespaceKind;
use crate::{Error, Result};
use std::io::{Read, Write};
use xmltree::{Element, Namespace, XMLNode};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse un document XML depuis un lecteur
pub fn parse<R: Read>(mut reader: R) -> Result<XmlTree> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_slice(&bytes)
}

/// Parse un document XML depuis des octets. Un BOM UTF-8 en tête est ignoré.
pub fn parse_slice(bytes: &[u8]) -> Result<XmlTree> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let root = Element::parse(bytes)?;
    from_element(&root)
}

/// Construit un arbre dont `root` est l'unique élément de premier niveau
pub fn from_element(root: &Element) -> Result<XmlTree> {
    let tree = XmlTree::new();
    let node = import_element(&tree, root)?;
    tree.document().append(&node)?;
    Ok(tree)
}

fn import_element(tree: &XmlTree, element: &Element) -> Result<NodeRef> {
    let node = tree.create_element(&element.name, element.namespace.as_deref());

    // L'ordre d'une HashMap n'est pas stable : on trie pour une sortie reproductible
    let mut attributes: Vec<(&String, &String)> = element.attributes.iter().collect();
    attributes.sort();
    for (name, value) in attributes {
        node.set_attribute(name, value);
    }

    for child in &element.children {
        let child_node = match child {
            XMLNode::Element(child) => import_element(tree, child)?,
            XMLNode::Text(text) | XMLNode::CData(text) => tree.create_text(text),
            XMLNode::Comment(comment) => tree.create_comment(comment),
            XMLNode::ProcessingInstruction(target, _) => {
                tracing::trace!("Skipping processing instruction <?{}?>", target);
                continue;
            }
        };
        node.append(&child_node)?;
    }

    Ok(node)
}

/// Convertit le sous-arbre de `node` en `xmltree::Element`.
///
/// Le namespace de chaque élément est normalement déclaré comme namespace
/// par défaut. `xml-rs` ne sait pas écrire `xmlns=""` : si un élément sans
/// namespace se trouve sous un élément qui en a un, tous les namespaces
/// reçoivent un préfixe déclaré sur la racine, et les éléments sans
/// namespace restent sans préfixe.
///
/// Retourne `None` si `node` n'est pas un élément.
pub fn to_element(node: &NodeRef) -> Option<Element> {
    if !node.is_element() {
        return None;
    }

    if has_unqualified_under_namespaced(node, false) {
        let prefixes = assign_prefixes(node);
        tracing::trace!(
            "Writing with prefixed namespaces ({} declared)",
            prefixes.len()
        );
        let mut element = export_element(node, &Naming::Prefixed(prefixes.as_slice()))?;
        let mut namespaces = Namespace::empty();
        for (uri, prefix) in &prefixes {
            namespaces.put(prefix.as_str(), uri.as_str());
        }
        element.namespaces = Some(namespaces);
        Some(element)
    } else {
        export_element(node, &Naming::Default(None))
    }
}

/// Stratégie de nommage des namespaces à l'écriture
enum Naming<'a> {
    /// Namespace par défaut, hérité du parent
    Default(Option<&'a str>),
    /// Préfixes par URI, déclarés sur la racine
    Prefixed(&'a [(String, String)]),
}

fn has_unqualified_under_namespaced(node: &NodeRef, under_namespace: bool) -> bool {
    let Some(namespace) = node.with_element(|e| e.namespace.clone()) else {
        return false;
    };
    if under_namespace && namespace.is_none() {
        return true;
    }
    let under = under_namespace || namespace.is_some();
    node.children()
        .iter()
        .any(|child| has_unqualified_under_namespaced(child, under))
}

/// Un préfixe par URI du sous-arbre, dans l'ordre de première apparition
fn assign_prefixes(node: &NodeRef) -> Vec<(String, String)> {
    let mut uris = Vec::new();
    collect_namespaces(node, &mut uris);

    let mut others = 0;
    uris.into_iter()
        .map(|uri| {
            let prefix = match NamespaceKind::classify(Some(uri.as_str())) {
                Some(NamespaceKind::Canonical) => "xspf".to_string(),
                Some(NamespaceKind::Legacy) => "xspf0".to_string(),
                _ => {
                    others += 1;
                    format!("ns{}", others)
                }
            };
            (uri, prefix)
        })
        .collect()
}

fn collect_namespaces(node: &NodeRef, uris: &mut Vec<String>) {
    if let Some(Some(uri)) = node.with_element(|e| e.namespace.clone()) {
        if !uris.contains(&uri) {
            uris.push(uri);
        }
    }
    for child in node.children() {
        collect_namespaces(&child, uris);
    }
}

fn export_element(node: &NodeRef, naming: &Naming<'_>) -> Option<Element> {
    let NodeData::Element(data) = node.data() else {
        return None;
    };

    let mut element = Element::new(&data.name);
    element.namespace = data.namespace.clone();

    match naming {
        Naming::Default(inherited) => {
            // Seul le namespace par défaut est déclaré, là où il change
            if data.namespace.as_deref() != *inherited {
                if let Some(uri) = &data.namespace {
                    let mut namespaces = Namespace::empty();
                    namespaces.put("", uri.as_str());
                    element.namespaces = Some(namespaces);
                }
            }
        }
        Naming::Prefixed(prefixes) => {
            element.prefix = data.namespace.as_ref().and_then(|uri| {
                prefixes
                    .iter()
                    .find(|(known, _)| known == uri)
                    .map(|(_, prefix)| prefix.clone())
            });
        }
    }

    for (name, value) in data.attributes {
        element.attributes.insert(name, value);
    }

    let child_naming = match naming {
        Naming::Default(_) => Naming::Default(data.namespace.as_deref()),
        Naming::Prefixed(prefixes) => Naming::Prefixed(*prefixes),
    };

    for child in node.children() {
        match child.data() {
            NodeData::Element(_) => {
                if let Some(child_element) = export_element(&child, &child_naming) {
                    element.children.push(XMLNode::Element(child_element));
                }
            }
            NodeData::Text(text) => element.children.push(XMLNode::Text(text)),
            NodeData::Comment(comment) => element.children.push(XMLNode::Comment(comment)),
            NodeData::Document => {}
        }
    }

    Some(element)
}

/// Écrit l'élément `root` et son contenu
pub fn write<W: Write>(root: &NodeRef, writer: W, options: &SaveOptions) -> Result<()> {
    let element = to_element(root).ok_or(Error::MissingRootElement)?;
    element.write_with_config(writer, options.emitter_config())?;
    Ok(())
}
