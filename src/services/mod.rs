// Catalog, customers and selection lists
pub mod catalog;
pub mod customers;
pub mod reference_lists;

// Quotations and bulk loading
pub mod product_import;
pub mod quotations;

use std::sync::Arc;

use crate::{config::AppConfig, db::DbPool};

use self::{
    catalog::CatalogService, customers::CustomerService, quotations::QuotationService,
    reference_lists::ReferenceListService,
};

/// Service container holding all service instances
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub customers: Arc<CustomerService>,
    pub reference_lists: Arc<ReferenceListService>,
    pub quotations: Arc<QuotationService>,
}

impl AppServices {
    /// Creates every service over the shared pool
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(
                db_pool.clone(),
                config.catalog_page_size,
            )),
            customers: Arc::new(CustomerService::new(db_pool.clone())),
            reference_lists: Arc::new(ReferenceListService::new(db_pool.clone())),
            quotations: Arc::new(QuotationService::new(db_pool)),
        }
    }
}
