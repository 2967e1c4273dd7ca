//! Category service - user-editable category list

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{is_classifier_category, Category, CategoryKind, OTHER_CATEGORY};
use crate::ports::Repository;

/// Outcome of removing a category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRemoval {
    pub name: String,
    /// Transactions moved to `Other`
    pub relabeled: usize,
}

pub struct CategoryService {
    repository: Arc<dyn Repository>,
}

impl CategoryService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    pub fn list(&self) -> Result<Vec<Category>> {
        self.repository.get_categories()
    }

    /// Find a category by name, ignoring case
    pub fn find(&self, name: &str) -> Result<Option<Category>> {
        let name = name.trim();
        Ok(self
            .list()?
            .into_iter()
            .find(|c| c.name.to_lowercase() == name.to_lowercase()))
    }

    pub fn add(&self, name: &str, kind: CategoryKind) -> Result<Category> {
        let name = validate_name(name)?;
        if self.find(name)?.is_some() {
            return Err(Error::validation(format!("Category '{}' already exists", name)));
        }

        let category = Category::new(name, kind);
        self.repository.upsert_category(&category)?;
        Ok(category)
    }

    /// Rename a category and carry its transactions along
    ///
    /// `Other` and the categories imported rows are sorted into keep their
    /// names; renaming those would strand later imports.
    pub fn rename(&self, id: Uuid, new_name: &str) -> Result<Category> {
        let new_name = validate_name(new_name)?;
        let mut category = self.get(id)?;
        if category.is_other() || is_classifier_category(&category.name) {
            return Err(Error::validation(format!(
                "'{}' is used by statement import and cannot be renamed",
                category.name
            )));
        }
        if let Some(existing) = self.find(new_name)? {
            if existing.id != id {
                return Err(Error::validation(format!(
                    "Category '{}' already exists",
                    new_name
                )));
            }
        }

        let old_name = std::mem::replace(&mut category.name, new_name.to_string());
        self.repository.upsert_category(&category)?;
        self.repository.relabel_transactions(&old_name, new_name)?;
        Ok(category)
    }

    /// Remove a category; its transactions become `Other`
    pub fn remove(&self, id: Uuid) -> Result<CategoryRemoval> {
        let category = self.get(id)?;
        if category.is_other() {
            return Err(Error::validation(format!("'{}' cannot be removed", OTHER_CATEGORY)));
        }

        let relabeled = self
            .repository
            .relabel_transactions(&category.name, OTHER_CATEGORY)?;
        self.repository.delete_category(id)?;

        Ok(CategoryRemoval {
            name: category.name,
            relabeled,
        })
    }

    fn get(&self, id: Uuid) -> Result<Category> {
        self.list()?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::not_found(format!("Category {}", id)))
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }
    Ok(name)
}
