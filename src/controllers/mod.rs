//! MVC controllers and their registration under the conventional route.

pub mod departments;
pub mod home;
pub mod sales_records;
pub mod sellers;

use axum::routing::{get, post};

use crate::routing::{ConventionalRouter, RouteTemplate};

pub fn routes(template: RouteTemplate) -> ConventionalRouter {
    ConventionalRouter::new(template)
        .action("Home", "Index", get(home::index))
        .action("Home", "About", get(home::about))
        .action("Home", "Contact", get(home::contact))
        .action("Home", "Error", get(home::error))
        .action("Departments", "Index", get(departments::index))
        .action("Departments", "Details", get(departments::details))
        .action("Departments", "Create", get(departments::create).post(departments::create_post))
        .action("Departments", "Edit", get(departments::edit).post(departments::edit_post))
        .action("Departments", "Delete", get(departments::delete).post(departments::delete_confirmed))
        .action("Departments", "DeleteConfirmed", post(departments::delete_confirmed))
        .action("Sellers", "Index", get(sellers::index))
        .action("Sellers", "Create", get(sellers::create).post(sellers::create_post))
        .action("Sellers", "Delete", get(sellers::delete).post(sellers::delete_post))
        .action("Sellers", "Details", get(sellers::details))
        .action("Sellers", "Edit", get(sellers::edit).post(sellers::edit_post))
        .action("Sellers", "Error", get(sellers::error))
        .action("SalesRecords", "Index", get(sales_records::index))
        .action("SalesRecords", "SimpleSearch", get(sales_records::simple_search))
        .action("SalesRecords", "GroupingSearch", get(sales_records::grouping_search))
}
