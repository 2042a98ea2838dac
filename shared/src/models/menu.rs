//! Menu Model

use serde::{Deserialize, Serialize};

use super::event::EventSummary;

/// Menu category (antipasti, primi, dolci, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Price in cents
    pub price_cents: i64,
    /// Object storage key, served through `/images/{key}`
    pub image_key: Option<String>,
    /// Dietary / marketing tags ("vegan", "spicy", ...)
    pub tags: Vec<String>,
    pub is_available: bool,
    pub is_featured: bool,
    pub sort_order: i32,
}

/// A category together with its orderable items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSection {
    #[serde(flatten)]
    pub category: MenuCategory,
    pub items: Vec<MenuItem>,
}

/// Gallery image entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct GalleryImage {
    pub id: i64,
    pub image_key: String,
    pub caption: Option<String>,
    pub sort_order: i32,
}

/// Home page content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeContent {
    pub featured: Vec<MenuItem>,
    pub upcoming_events: Vec<EventSummary>,
}

/// Group items under their categories, preserving category order.
///
/// Items whose category is not in `categories` are dropped, as are
/// categories left without items.
pub fn group_menu(categories: Vec<MenuCategory>, items: Vec<MenuItem>) -> Vec<MenuSection> {
    let mut sections: Vec<MenuSection> = categories
        .into_iter()
        .map(|category| MenuSection {
            category,
            items: Vec::new(),
        })
        .collect();

    for item in items {
        if let Some(section) = sections
            .iter_mut()
            .find(|s| s.category.id == item.category_id)
        {
            section.items.push(item);
        }
    }

    sections.retain(|s| !s.items.is_empty());
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str) -> MenuCategory {
        MenuCategory {
            id,
            name: name.to_string(),
            description: None,
            sort_order: id as i32,
        }
    }

    fn item(id: i64, category_id: i64) -> MenuItem {
        MenuItem {
            id,
            category_id,
            name: format!("item-{id}"),
            description: None,
            price_cents: 1200,
            image_key: None,
            tags: vec![],
            is_available: true,
            is_featured: false,
            sort_order: 0,
        }
    }

    #[test]
    fn test_group_menu_keeps_category_order() {
        let sections = group_menu(
            vec![category(1, "Antipasti"), category(2, "Primi")],
            vec![item(10, 2), item(11, 1), item(12, 2)],
        );
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].category.name, "Antipasti");
        assert_eq!(sections[0].items.len(), 1);
        assert_eq!(sections[1].items.len(), 2);
    }

    #[test]
    fn test_group_menu_drops_empty_and_orphans() {
        let sections = group_menu(
            vec![category(1, "Antipasti"), category(2, "Dolci")],
            vec![item(10, 1), item(11, 99)],
        );
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].items[0].id, 10);
    }

    #[test]
    fn test_section_serializes_flat() {
        let sections = group_menu(vec![category(1, "Antipasti")], vec![item(10, 1)]);
        let json = serde_json::to_value(&sections[0]).unwrap();
        assert_eq!(json["name"], "Antipasti");
        assert_eq!(json["items"][0]["price_cents"], 1200);
    }
}
