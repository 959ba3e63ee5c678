//! Parts and categories as seen by the catalog.

use serde::Serialize;

use mast_core::{CategoryId, DomainError, DomainResult, Entity, InventoryId, PartId};

use crate::quantity::Quantity;

const MAX_TITLE_LEN: usize = 255;

/// Part category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Part joined with its category name and stock row.
///
/// Wire shape uses camelCase keys (`inventoryId`, `imageUrl`); `image_url` is
/// empty when no image was uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: PartId,
    pub inventory_id: InventoryId,
    pub title: String,
    pub category: String,
    pub quantity: Quantity,
    pub image_url: String,
}

impl Entity for Part {
    type Id = PartId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Validated input for part creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPart {
    title: String,
    category_id: CategoryId,
    quantity: Quantity,
}

impl NewPart {
    pub fn new(title: &str, category_id: CategoryId, quantity: i64) -> DomainResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::validation(format!(
                "title cannot exceed {MAX_TITLE_LEN} characters"
            )));
        }
        Ok(Self {
            title: title.to_string(),
            category_id,
            quantity: Quantity::new(quantity)?,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }
}

/// Optional filters for part listing; all present filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartFilter {
    name: Option<String>,
    category_id: Option<CategoryId>,
}

impl PartFilter {
    /// A blank name is treated as "no name filter".
    pub fn new(name: Option<String>, category_id: Option<CategoryId>) -> Self {
        let name = name.filter(|n| !n.is_empty());
        Self { name, category_id }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    /// Case-insensitive substring match on the title, exact match on the category.
    pub fn matches(&self, title: &str, category_id: CategoryId) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|n| title.to_lowercase().contains(&n.to_lowercase()));
        let category_ok = self.category_id.is_none_or(|c| c == category_id);
        name_ok && category_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_part_trims_title() {
        let p = NewPart::new("  Bolt M3 ", CategoryId::new(1), 4).unwrap();
        assert_eq!(p.title(), "Bolt M3");
        assert_eq!(p.quantity().get(), 4);
    }

    #[test]
    fn new_part_rejects_blank_title_and_negative_quantity() {
        assert!(matches!(
            NewPart::new("   ", CategoryId::new(1), 0),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            NewPart::new("Nut", CategoryId::new(1), -1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn filter_combines_with_and() {
        let f = PartFilter::new(Some("Bolt".into()), Some(CategoryId::new(2)));
        assert!(f.matches("Hex Bolt", CategoryId::new(2)));
        assert!(!f.matches("Hex Bolt", CategoryId::new(3)));
        assert!(!f.matches("Washer", CategoryId::new(2)));
    }

    #[test]
    fn name_filter_ignores_case() {
        let f = PartFilter::new(Some("hex BOLT".into()), None);
        assert!(f.matches("Hex Bolt M3", CategoryId::new(1)));
        assert!(!f.matches("Hex nut", CategoryId::new(1)));
    }

    #[test]
    fn blank_name_filter_matches_everything() {
        let f = PartFilter::new(Some(String::new()), None);
        assert_eq!(f.name(), None);
        assert!(f.matches("anything", CategoryId::new(9)));
    }

    #[test]
    fn part_serializes_with_camel_case_keys() {
        let part = Part {
            id: PartId::new(1),
            inventory_id: InventoryId::new(101),
            title: "Part A".into(),
            category: "Category A".into(),
            quantity: Quantity::new(10).unwrap(),
            image_url: String::new(),
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "inventoryId": 101,
                "title": "Part A",
                "category": "Category A",
                "quantity": 10,
                "imageUrl": "",
            })
        );
    }
}
