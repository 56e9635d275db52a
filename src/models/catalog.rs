//! Default search targets
//!
//! Suburb-level locations per country, the real-estate industry segments and
//! the query templates. All of it can be overridden from the config file.

use crate::models::Country;

const LOCATIONS_ZW: &[&str] = &[
    // Harare
    "Borrowdale Harare",
    "Mt Pleasant Harare",
    "Avondale Harare",
    "Greendale Harare",
    "Highlands Harare",
    "Belvedere Harare",
    "Eastlea Harare",
    "The Avenues Harare",
    "Chisipite Harare",
    "Glen Lorne Harare",
    // Bulawayo
    "Hillside Bulawayo",
    "Burnside Bulawayo",
    "Suburbs Bulawayo",
    "Matsheumhlope Bulawayo",
    "Mutare",
    "Gweru",
    "Masvingo",
    "Victoria Falls",
    "Chinhoyi",
    "Marondera",
];

const LOCATIONS_SA: &[&str] = &[
    // Gauteng
    "Sandton",
    "Fourways",
    "Rosebank",
    "Bryanston",
    "Hyde Park",
    "Randburg",
    "Midrand",
    "Centurion",
    "Waterkloof Pretoria",
    "Menlyn Pretoria",
    "Brooklyn Pretoria",
    // Western Cape
    "Constantia Cape Town",
    "Camps Bay Cape Town",
    "Sea Point Cape Town",
    "Stellenbosch",
    "Paarl",
    // KwaZulu-Natal
    "Umhlanga",
    "Ballito",
    "La Lucia Durban",
    "Durban North",
];

const INDUSTRIES: &[&str] = &[
    "Real Estate Agency",
    "Estate Agents",
    "Property Agents",
    "Realtors",
    "Property Management",
    "Letting Agents",
    "Rental Agents",
    "Commercial Real Estate",
    "Industrial Property",
    "Property Developers",
    "Property Valuers",
    "Conveyancing Attorneys",
    "Property Auctioneers",
    "Real Estate Investment",
];

const QUERY_TEMPLATES: &[&str] = &[
    "{industry} {location}",
    "{industry} in {location}",
    "top {industry} {location}",
    "best {industry} in {location}",
    "{location} {industry}",
    "property agents {location}",
    "estate agency {location}",
    "houses for sale {location}",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_locations(country: Country) -> Vec<String> {
    match country {
        Country::SouthAfrica => owned(LOCATIONS_SA),
        Country::Zimbabwe => owned(LOCATIONS_ZW),
    }
}

pub fn default_industries() -> Vec<String> {
    owned(INDUSTRIES)
}

pub fn default_query_templates() -> Vec<String> {
    owned(QUERY_TEMPLATES)
}
