//! Printable documents: product fact sheets, the catalog price list and
//! quotations.

pub mod pdf;
pub mod price_sheet;

pub use price_sheet::{
    catalog_filename, product_filename, quotation_filename, render_catalog, render_product,
    render_quotation,
};
