//! Catalog Store: the products on sale, in insertion order.
//!
//! Reads are public; mutations go through the inventory engine.

use crate::types::{Category, Product, ProductId, Subtype};
use serde::{Deserialize, Serialize};

/// The set of sellable products and their stock
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    products: Vec<Product>,
}

/// Products of one category grouped by subtype (grouped inventory view)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySection<'a> {
    /// The category
    pub category: Category,
    /// Section heading
    pub title: &'static str,
    /// Subtype groups in first-seen order
    pub groups: Vec<SubtypeGroup<'a>>,
}

/// Products sharing a subtype
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtypeGroup<'a> {
    /// The subtype
    pub subtype: Subtype,
    /// Group heading
    pub title: &'static str,
    /// Products in catalog order
    pub products: Vec<&'a Product>,
}

impl Catalog {
    /// Creates an empty catalog
    #[must_use]
    pub const fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Creates a catalog from previously stored products
    #[must_use]
    pub const fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Looks up a product
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Checks whether a product exists
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// All products in insertion order
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Iterates over products in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    /// Number of products
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true when the catalog has no products
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Total units on hand across all products
    #[must_use]
    pub fn total_stock(&self) -> u64 {
        self.products.iter().map(|p| u64::from(p.stock)).sum()
    }

    /// Distinct categories in first-seen order
    ///
    /// An empty catalog still shows the beverage tab.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = Vec::new();
        for product in &self.products {
            let category = product.category();
            if !seen.contains(&category) {
                seen.push(category);
            }
        }

        if seen.is_empty() {
            seen.push(Category::BeverageSnacks);
        }
        seen
    }

    /// Products in a category, in catalog order
    #[must_use]
    pub fn by_category(&self, category: Category) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.category() == category)
            .collect()
    }

    /// Grouped inventory view: one section per non-empty category, in
    /// [`Category::ALL`] order, each split into subtype groups
    #[must_use]
    pub fn sections(&self) -> Vec<CategorySection<'_>> {
        Category::ALL
            .into_iter()
            .filter_map(|category| {
                let mut groups: Vec<SubtypeGroup<'_>> = Vec::new();
                for product in self.by_category(category) {
                    if let Some(group) = groups.iter_mut().find(|g| g.subtype == product.subtype) {
                        group.products.push(product);
                    } else {
                        groups.push(SubtypeGroup {
                            subtype: product.subtype,
                            title: product.subtype.section_title(),
                            products: vec![product],
                        });
                    }
                }

                (!groups.is_empty()).then(|| CategorySection {
                    category,
                    title: category.title(),
                    groups,
                })
            })
            .collect()
    }

    pub(crate) fn get_mut(&mut self, id: ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    pub(crate) fn push(&mut self, product: Product) {
        self.products.push(product);
    }

    pub(crate) fn remove(&mut self, id: ProductId) -> Option<Product> {
        let index = self.products.iter().position(|p| p.id == id)?;
        Some(self.products.remove(index))
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}
