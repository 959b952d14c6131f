use serde::Serialize;

pub const PRODUCTS: [&str; 4] = ["AquaPure", "Kent RO", "Livpure", "Eureka Forbes"];

pub const SERVICE_TYPES: [&str; 4] = ["Installation", "Repair", "Maintenance", "Filter Change"];

#[derive(Debug, Clone, Serialize)]
pub struct CatalogService {
    pub id: &'static str,
    pub title: &'static str,
    pub price_dollars: u32,
    pub description: &'static str,
}

impl CatalogService {
    pub fn price_display(&self) -> String {
        format!("${}", self.price_dollars)
    }
}

pub const SERVICES: [CatalogService; 3] = [
    CatalogService {
        id: "1",
        title: "RO Water Purifier",
        price_dollars: 299,
        description: "Advanced RO purification system with 7 stages of filtration",
    },
    CatalogService {
        id: "2",
        title: "UV Water Purifier",
        price_dollars: 199,
        description: "UV technology for complete bacterial purification",
    },
    CatalogService {
        id: "3",
        title: "Water Softener",
        price_dollars: 399,
        description: "Advanced water softening system for hard water treatment",
    },
];

pub fn is_known_product(value: &str) -> bool {
    PRODUCTS.contains(&value)
}

pub fn is_known_service_type(value: &str) -> bool {
    SERVICE_TYPES.contains(&value)
}
