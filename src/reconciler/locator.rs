//! Name-based resource lookup.

use tracing::debug;

use crate::error::{ConvergeError, LocateError, Result};

use super::kind::ResourceApi;

/// Finds at most one resource by exact name within a folder.
pub struct ResourceLocator<'a, A: ResourceApi> {
    api: &'a A,
}

impl<'a, A: ResourceApi> ResourceLocator<'a, A> {
    /// Creates a locator over a resource service.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Looks a resource up by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Ambiguous`] if the name matches more than one
    /// resource and [`LocateError::Failed`] if the list call fails.
    pub async fn find(&self, folder_id: &str, name: &str) -> Result<Option<A::Resource>> {
        let filter = name_filter(name);
        debug!("Looking up {} in {folder_id} with filter {filter}", A::KIND);

        let page = self.api.list(folder_id, &filter).await.map_err(|e| match e {
            ConvergeError::Transport(source) => ConvergeError::Locate(LocateError::Failed {
                kind: A::KIND.to_string(),
                folder_id: folder_id.to_string(),
                name: name.to_string(),
                source,
            }),
            other => other,
        })?;

        let count = page.items.len() + usize::from(page.has_more);
        if count > 1 {
            return Err(ConvergeError::Locate(LocateError::Ambiguous {
                kind: A::KIND.to_string(),
                folder_id: folder_id.to_string(),
                name: name.to_string(),
                count,
            }));
        }

        let found = page.items.into_iter().next();
        debug!(
            "{} '{name}' {}",
            A::KIND,
            if found.is_some() { "found" } else { "not found" }
        );
        Ok(found)
    }
}

/// Builds the list filter for an exact name match.
#[must_use]
pub fn name_filter(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("name = \"{escaped}\"")
}
