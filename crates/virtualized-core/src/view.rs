use std::cell::Cell;

use crate::Modifier;

pub type ViewId = u64;

thread_local! {
    static NEXT_VIEW_ID: Cell<ViewId> = const { Cell::new(1) };
}

/// Allocates an id that stays stable for as long as its owner keeps it.
pub fn new_view_id() -> ViewId {
    NEXT_VIEW_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    })
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewKind {
    /// A host element such as `div` or `li`.
    Element { tag: String },
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct View {
    pub id: ViewId,
    pub kind: ViewKind,
    pub modifier: Modifier,
    pub children: Vec<View>,
}

impl View {
    pub fn new(id: ViewId, kind: ViewKind) -> Self {
        View {
            id,
            kind,
            modifier: Modifier::default(),
            children: vec![],
        }
    }
    pub fn element(id: ViewId, tag: impl Into<String>) -> Self {
        Self::new(id, ViewKind::Element { tag: tag.into() })
    }
    pub fn text(id: ViewId, text: impl Into<String>) -> Self {
        Self::new(id, ViewKind::Text(text.into()))
    }
    pub fn modifier(mut self, m: Modifier) -> Self {
        self.modifier = m;
        self
    }
    pub fn with_children(mut self, kids: Vec<View>) -> Self {
        self.children = kids;
        self
    }
    pub fn child(mut self, kid: View) -> Self {
        self.children.push(kid);
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            ViewKind::Element { tag } => Some(tag.as_str()),
            ViewKind::Text(_) => None,
        }
    }

    /// Depth-first lookup.
    pub fn find(&self, id: ViewId) -> Option<&View> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}
