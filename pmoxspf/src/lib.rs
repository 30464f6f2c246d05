//! # pmoxspf - Modèle de playlists XSPF sur arbre XML
//!
//! Cette crate expose un document XSPF ("XML Shareable Playlist Format")
//! sous forme de vues typées posées sur un arbre XML :
//! - Lecture et écriture des métadonnées (titre, auteur, URI, date)
//! - Liste de morceaux vivante, toujours synchronisée avec l'arbre
//! - Mode strict (namespace canonique) ou tolérant (namespaces hérités)
//! - Chargement et sauvegarde via `xmltree`, configuration YAML
//!
//! # Architecture
//!
//! - **Xspf** : document, possède l'arbre et l'élément racine `playlist`
//! - **TrackList** : vue ordonnée sur les `<track>` d'un `<trackList>`
//! - **Track** : handle sur un élément `<track>`
//! - **resolver** : recherche et normalisation des éléments scalaires
//! - **tree** : arène de nœuds et passerelle vers le codec XML
//!
//! Les vues ne stockent rien : deux vues sur le même nœud voient les mêmes
//! changements, et une modification faite directement sur l'arbre est visible
//! immédiatement. Les types ne sont ni `Send` ni `Sync`.
//!
//! # Exemple d'utilisation
//!
//! ```
//! use pmoxspf::{Mode, Xspf};
//!
//! let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <playlist version="1" xmlns="http://xspf.org/ns/0/">
//!   <title>Radio Paradise - Main Mix</title>
//!   <trackList>
//!     <track><location>file:///music/song_1.ogg</location></track>
//!   </trackList>
//! </playlist>"#;
//!
//! let xspf = Xspf::load_from_str(xml, Mode::Strict)?;
//! let tracks = xspf.track_list()?;
//!
//! for track in &tracks {
//!     println!("{:?}", track.location()?);
//! }
//!
//! let added = xspf.create_track();
//! added.set_title(Some("Song 2"));
//! tracks.add(&added)?;
//! assert_eq!(tracks.count(), 2);
//! # Ok::<(), pmoxspf::Error>(())
//! ```

mod error;
mod playlist;
mod track;
mod track_list;

pub mod config;
pub mod namespace;
pub mod resolver;
pub mod tree;

// Réexports publics
pub use config::{SaveOptions, XspfConfig};
pub use error::{Error, Result};
pub use namespace::{Mode, NamespaceKind, XSPF_NS, XSPF_NS_LEGACY};
pub use playlist::Xspf;
pub use track::Track;
pub use track_list::{Iter, TrackList};
pub use tree::{NodeData, NodeId, NodeRef, XmlTree};
