// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Character definitions.
//!
//! Upstream loaders parse movie data into a library of characters; the
//! timeline engine instantiates them into display nodes on demand. The
//! library owns templates only — instances live in the
//! [`DisplayStore`](crate::node::DisplayStore).

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use zoetrope_text::TextField;

use crate::clip::MovieClipState;
use crate::node::{DisplayStore, GeometryId, NodeId, NodeKind};
use crate::timeline::Timeline;

/// A handle to a character definition in a [`Library`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacterId(pub u32);

impl fmt::Debug for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharacterId({})", self.0)
    }
}

/// What a character instantiates as.
pub enum CharacterDef {
    /// A static shape referencing externally built geometry.
    Shape(GeometryId),
    /// A sprite, optionally with its own geometry.
    Sprite(Option<GeometryId>),
    /// A nested movie clip driven by the given timeline.
    MovieClip(Rc<Timeline>),
    /// A text field cloned from the given template. Instances keep a
    /// pristine snapshot so timeline rollback can restore their text.
    Text(TextField),
}

impl fmt::Debug for CharacterDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(geometry) => f.debug_tuple("Shape").field(geometry).finish(),
            Self::Sprite(geometry) => f.debug_tuple("Sprite").field(geometry).finish(),
            Self::MovieClip(timeline) => f
                .debug_struct("MovieClip")
                .field("num_frames", &timeline.num_frames())
                .finish(),
            Self::Text(_) => f.debug_struct("Text").finish_non_exhaustive(),
        }
    }
}

/// A character definition plus its instantiation policy.
#[derive(Debug)]
pub struct Character {
    /// What to instantiate.
    pub def: CharacterDef,
    /// When set, every placement gets a fresh instance instead of reusing
    /// the clip's cached one.
    pub clone_per_instance: bool,
}

impl Character {
    /// A character with the default shared-instance policy.
    #[must_use]
    pub fn new(def: CharacterDef) -> Self {
        Self {
            def,
            clone_per_instance: false,
        }
    }
}

/// The character registry.
#[derive(Debug, Default)]
pub struct Library {
    characters: Vec<Character>,
}

impl Library {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a character and returns its id.
    pub fn register(&mut self, character: Character) -> CharacterId {
        let id = CharacterId(u32::try_from(self.characters.len()).expect("library overflow"));
        self.characters.push(character);
        id
    }

    /// Returns a character definition.
    ///
    /// # Panics
    ///
    /// Panics if the id is unknown.
    #[must_use]
    pub fn character(&self, id: CharacterId) -> &Character {
        self.characters
            .get(id.0 as usize)
            .unwrap_or_else(|| panic!("unknown {id:?}"))
    }

    /// Number of registered characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Instantiates a character into a fresh display node.
    pub fn instantiate(&self, store: &mut DisplayStore, id: CharacterId) -> NodeId {
        let kind = match &self.character(id).def {
            CharacterDef::Shape(geometry) => NodeKind::Shape(*geometry),
            CharacterDef::Sprite(geometry) => NodeKind::Sprite(*geometry),
            CharacterDef::MovieClip(timeline) => {
                NodeKind::MovieClip(Box::new(MovieClipState::new(timeline.clone())))
            }
            CharacterDef::Text(template) => NodeKind::Text(Box::new(template.clone_field())),
        };
        store.create_node(kind)
    }
}
