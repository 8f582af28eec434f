//! Domain entities: departments own sellers, sellers own sales records.

pub mod department;
pub mod sales_record;
pub mod seller;

pub use department::{Department, DepartmentForm};
pub use sales_record::{SaleStatus, SalesRecord};
pub use seller::{Seller, SellerForm, ValidationErrors};
