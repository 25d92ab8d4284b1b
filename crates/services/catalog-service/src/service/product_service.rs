//! Product service - catalog rules and the product detail read model.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::normalize::{collapse_whitespace, normalize_sku, required_text};
use domain::{NewProduct, Product, ProductDetail, ProductPatch};

use crate::repository::{
    CategoryRepository, InventoryRepository, ListQuery, Page, ProductRepository,
};

#[async_trait]
pub trait ProductService: Send + Sync {
    /// Validate, then create the product together with its stock row
    async fn create_product(&self, new: NewProduct) -> AppResult<ProductDetail>;

    /// Product, its category and its stock, read in that order.
    ///
    /// Any failing read aborts the whole assembly.
    async fn get_product_detail(&self, id: i32) -> AppResult<ProductDetail>;

    async fn update_product(&self, id: i32, patch: ProductPatch) -> AppResult<ProductDetail>;

    async fn delete_product(&self, id: i32) -> AppResult<()>;

    async fn list_products(&self, query: &ListQuery) -> AppResult<Page<Product>>;
}

pub struct ProductManager {
    products: Arc<dyn ProductRepository>,
    categories: Arc<dyn CategoryRepository>,
    inventories: Arc<dyn InventoryRepository>,
}

impl ProductManager {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        categories: Arc<dyn CategoryRepository>,
        inventories: Arc<dyn InventoryRepository>,
    ) -> Self {
        Self {
            products,
            categories,
            inventories,
        }
    }

    /// Fail with Conflict when another live product already holds `sku`.
    async fn ensure_sku_free(&self, sku: &str, owner: Option<i32>) -> AppResult<()> {
        match self.products.get_by_sku(sku).await {
            Ok(existing) if Some(existing.id) != owner => Err(AppError::conflict("SKU")),
            Ok(_) | Err(AppError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn validate_price(price: f64) -> AppResult<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::invalid_input("Price must be zero or more"));
    }
    Ok(price)
}

fn validate_category_id(category_id: i32) -> AppResult<i32> {
    if category_id <= 0 {
        return Err(AppError::invalid_input("Category is required"));
    }
    Ok(category_id)
}

#[async_trait]
impl ProductService for ProductManager {
    async fn create_product(&self, new: NewProduct) -> AppResult<ProductDetail> {
        let new = NewProduct {
            name: required_text("Product name", &new.name)?,
            description: collapse_whitespace(&new.description),
            price: validate_price(new.price)?,
            sku: normalize_sku(&new.sku)?,
            category_id: validate_category_id(new.category_id)?,
        };

        self.ensure_sku_free(&new.sku, None).await?;
        let category = self.categories.get_by_id(new.category_id).await?;

        let (product, inventory) = self.products.create(new).await?;

        Ok(ProductDetail {
            product,
            category,
            inventory,
        })
    }

    async fn get_product_detail(&self, id: i32) -> AppResult<ProductDetail> {
        let product = self.products.get_by_id(id).await?;
        let category = self.categories.get_by_id(product.category_id).await?;
        let inventory = self.inventories.get_by_product_id(product.id).await?;

        Ok(ProductDetail {
            product,
            category,
            inventory,
        })
    }

    async fn update_product(&self, id: i32, patch: ProductPatch) -> AppResult<ProductDetail> {
        let current = self.products.get_by_id(id).await?;

        let patch = ProductPatch {
            name: patch
                .name
                .map(|name| required_text("Product name", &name))
                .transpose()?,
            description: patch.description.map(|d| collapse_whitespace(&d)),
            price: patch.price.map(validate_price).transpose()?,
            sku: patch.sku.map(|sku| normalize_sku(&sku)).transpose()?,
            category_id: patch.category_id.map(validate_category_id).transpose()?,
            is_active: patch.is_active,
        };

        if let Some(sku) = patch.sku.as_deref().filter(|sku| *sku != current.sku) {
            self.ensure_sku_free(sku, Some(id)).await?;
        }

        let updated = patch.apply(current);
        let category = self.categories.get_by_id(updated.category_id).await?;
        let product = self.products.update(updated).await?;
        let inventory = self.inventories.get_by_product_id(id).await?;

        Ok(ProductDetail {
            product,
            category,
            inventory,
        })
    }

    async fn delete_product(&self, id: i32) -> AppResult<()> {
        self.products.delete(id).await
    }

    async fn list_products(&self, query: &ListQuery) -> AppResult<Page<Product>> {
        self.products.list(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockCategoryRepository, MockInventoryRepository, MockProductRepository};
    use chrono::Utc;
    use domain::{Category, Inventory};
    use mockall::predicate::eq;

    fn category(id: i32) -> Category {
        let now = Utc::now();
        Category {
            id,
            name: "Brakes".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn product(id: i32) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: "Brake pad".to_string(),
            description: String::new(),
            price: 12.5,
            sku: "BP-100".to_string(),
            category_id: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn inventory(product_id: i32, quantity: i32) -> Inventory {
        let now = Utc::now();
        Inventory {
            id: 40 + product_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    fn new_product(sku: &str) -> NewProduct {
        NewProduct {
            name: " Brake  pad ".to_string(),
            description: "front".to_string(),
            price: 12.5,
            sku: sku.to_string(),
            category_id: 3,
        }
    }

    fn manager(
        products: MockProductRepository,
        categories: MockCategoryRepository,
        inventories: MockInventoryRepository,
    ) -> ProductManager {
        ProductManager::new(Arc::new(products), Arc::new(categories), Arc::new(inventories))
    }

    #[tokio::test]
    async fn test_create_normalises_and_returns_detail() {
        let mut products = MockProductRepository::new();
        products
            .expect_get_by_sku()
            .with(eq("BP-100"))
            .returning(|_| Err(AppError::NotFound));
        products
            .expect_create()
            .withf(|new| new.sku == "BP-100" && new.name == "Brake pad")
            .times(1)
            .returning(|_| Ok((product(1), inventory(1, 0))));

        let mut categories = MockCategoryRepository::new();
        categories.expect_get_by_id().with(eq(3)).returning(|id| Ok(category(id)));

        let service = manager(products, categories, MockInventoryRepository::new());
        let detail = service.create_product(new_product(" bp-100 ")).await.unwrap();

        assert_eq!(detail.product.sku, "BP-100");
        assert_eq!(detail.category.id, 3);
        assert_eq!(detail.inventory.quantity, 0);
    }

    #[tokio::test]
    async fn test_create_with_taken_sku_conflicts() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_sku().returning(|_| Ok(product(9)));
        products.expect_create().never();

        let service = manager(
            products,
            MockCategoryRepository::new(),
            MockInventoryRepository::new(),
        );
        let err = service.create_product(new_product("BP-100")).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_store() {
        let service = manager(
            MockProductRepository::new(),
            MockCategoryRepository::new(),
            MockInventoryRepository::new(),
        );

        let bad_sku = service.create_product(new_product("b p")).await.unwrap_err();
        assert!(matches!(bad_sku, AppError::InvalidInput(_)));

        let negative = NewProduct {
            price: -1.0,
            ..new_product("BP-100")
        };
        let err = service.create_product(negative).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_requires_existing_category() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_sku().returning(|_| Err(AppError::NotFound));
        products.expect_create().never();

        let mut categories = MockCategoryRepository::new();
        categories.expect_get_by_id().returning(|_| Err(AppError::NotFound));

        let service = manager(products, categories, MockInventoryRepository::new());
        let err = service.create_product(new_product("BP-100")).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_detail_assembles_three_reads() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_id().with(eq(1)).returning(|id| Ok(product(id)));
        let mut categories = MockCategoryRepository::new();
        categories.expect_get_by_id().with(eq(3)).returning(|id| Ok(category(id)));
        let mut inventories = MockInventoryRepository::new();
        inventories
            .expect_get_by_product_id()
            .with(eq(1))
            .returning(|pid| Ok(inventory(pid, 7)));

        let service = manager(products, categories, inventories);
        let detail = service.get_product_detail(1).await.unwrap();

        assert_eq!(detail.product.id, 1);
        assert_eq!(detail.category.name, "Brakes");
        assert_eq!(detail.inventory.quantity, 7);
    }

    #[tokio::test]
    async fn test_detail_aborts_on_missing_stock_row() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_id().returning(|id| Ok(product(id)));
        let mut categories = MockCategoryRepository::new();
        categories.expect_get_by_id().returning(|id| Ok(category(id)));
        let mut inventories = MockInventoryRepository::new();
        inventories
            .expect_get_by_product_id()
            .returning(|_| Err(AppError::NotFound));

        let service = manager(products, categories, inventories);
        let err = service.get_product_detail(1).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_detail_stops_after_first_failure() {
        let mut products = MockProductRepository::new();
        products
            .expect_get_by_id()
            .returning(|_| Err(AppError::internal("timeout")));
        let mut categories = MockCategoryRepository::new();
        categories.expect_get_by_id().never();
        let mut inventories = MockInventoryRepository::new();
        inventories.expect_get_by_product_id().never();

        let service = manager(products, categories, inventories);
        let err = service.get_product_detail(1).await.unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_update_keeping_own_sku_skips_conflict_check() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_id().returning(|id| Ok(product(id)));
        products.expect_get_by_sku().never();
        products
            .expect_update()
            .withf(|p| p.price == 20.0 && p.sku == "BP-100")
            .returning(Ok);
        let mut categories = MockCategoryRepository::new();
        categories.expect_get_by_id().returning(|id| Ok(category(id)));
        let mut inventories = MockInventoryRepository::new();
        inventories
            .expect_get_by_product_id()
            .returning(|pid| Ok(inventory(pid, 2)));

        let service = manager(products, categories, inventories);
        let patch = ProductPatch {
            price: Some(20.0),
            sku: Some("bp-100".to_string()),
            ..ProductPatch::default()
        };
        let detail = service.update_product(1, patch).await.unwrap();

        assert_eq!(detail.product.price, 20.0);
    }

    #[tokio::test]
    async fn test_update_to_sku_of_other_product_conflicts() {
        let mut products = MockProductRepository::new();
        products.expect_get_by_id().returning(|id| Ok(product(id)));
        products.expect_get_by_sku().returning(|_| Ok(product(2)));
        products.expect_update().never();

        let service = manager(
            products,
            MockCategoryRepository::new(),
            MockInventoryRepository::new(),
        );
        let patch = ProductPatch {
            sku: Some("BP-200".to_string()),
            ..ProductPatch::default()
        };
        let err = service.update_product(1, patch).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }
}
