//! Headless page model.
//!
//! Stands in for the document the dashboard scripts mutate: two status text
//! slots, the image gallery, the current location and the set of forms whose
//! controls are disabled. Every mutation takes the lock for one synchronous
//! step and never across an `.await`, so a handler's update is atomic with
//! respect to every other handler.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One rendered gallery card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCard {
    pub name: String,
    /// Image source path.
    pub src: String,
    /// Where clicking the card leads, when it links anywhere.
    pub link: Option<String>,
}

/// What the gallery container currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gallery {
    Cards(Vec<ImageCard>),
    Message(String),
}

impl Default for Gallery {
    fn default() -> Self {
        Gallery::Cards(Vec::new())
    }
}

impl Gallery {
    pub fn cards(&self) -> &[ImageCard] {
        match self {
            Gallery::Cards(cards) => cards,
            Gallery::Message(_) => &[],
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Gallery::Message(m) => Some(m),
            Gallery::Cards(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

/// Header shown at the top of every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub title: String,
    /// "Logged in as ..." user, if any.
    pub user: Option<String>,
    pub links: Vec<NavLink>,
    pub show_logout: bool,
}

impl std::fmt::Display for Navigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        if let Some(user) = &self.user {
            writeln!(f, "Logged in as {user}")?;
        }
        let links: Vec<String> = self
            .links
            .iter()
            .map(|l| format!("{} ({})", l.label, l.href))
            .collect();
        write!(f, "{}", links.join(" | "))?;
        if self.show_logout {
            write!(f, " | Logout")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub title: String,
    pub location: String,
    pub virtual_nodes: String,
    pub physical_nodes: String,
    pub gallery: Gallery,
    pub navigation: Option<Navigation>,
    pub disabled_forms: BTreeSet<String>,
}

#[derive(Clone)]
pub struct Page {
    inner: Arc<Mutex<PageState>>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new("Dynamo Control Panel")
    }
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PageState {
                title: title.into(),
                location: "/".to_string(),
                ..Default::default()
            })),
        }
    }

    pub fn snapshot(&self) -> PageState {
        self.lock().clone()
    }

    pub fn set_status(&self, virtual_nodes: String, physical_nodes: String) {
        let mut state = self.lock();
        state.virtual_nodes = virtual_nodes;
        state.physical_nodes = physical_nodes;
    }

    pub fn virtual_nodes(&self) -> String {
        self.lock().virtual_nodes.clone()
    }

    pub fn physical_nodes(&self) -> String {
        self.lock().physical_nodes.clone()
    }

    pub fn set_gallery(&self, gallery: Gallery) {
        self.lock().gallery = gallery;
    }

    pub fn gallery(&self) -> Gallery {
        self.lock().gallery.clone()
    }

    pub fn navigate(&self, location: impl Into<String>) {
        let location = location.into();
        debug!(%location, "navigate");
        self.lock().location = location;
    }

    pub fn location(&self) -> String {
        self.lock().location.clone()
    }

    /// Rebuild the header for the given session user.
    pub fn render_navigation(&self, user: Option<&str>) -> Navigation {
        let mut state = self.lock();
        let link = |label: &str, href: &str| NavLink {
            label: label.to_string(),
            href: href.to_string(),
        };
        let nav = match user {
            Some(name) => Navigation {
                title: state.title.clone(),
                user: Some(name.to_string()),
                links: vec![
                    link("Home", "/"),
                    link("Upload", "/upload"),
                    link("Gallery", "/gallery"),
                ],
                show_logout: true,
            },
            None => Navigation {
                title: state.title.clone(),
                user: None,
                links: vec![link("Home", "/"), link("Login", "/login")],
                show_logout: false,
            },
        };
        state.navigation = Some(nav.clone());
        nav
    }

    pub fn navigation(&self) -> Option<Navigation> {
        self.lock().navigation.clone()
    }

    /// Disable a form's controls until the returned lock is dropped.
    pub fn disable_form(&self, form: &str) -> FormLock {
        self.lock().disabled_forms.insert(form.to_string());
        FormLock {
            page: self.clone(),
            form: form.to_string(),
        }
    }

    pub fn is_form_disabled(&self, form: &str) -> bool {
        self.lock().disabled_forms.contains(form)
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Re-enables a form's controls on drop.
pub struct FormLock {
    page: Page,
    form: String,
}

impl Drop for FormLock {
    fn drop(&mut self) {
        self.page.lock().disabled_forms.remove(&self.form);
    }
}
