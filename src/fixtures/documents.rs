// SPDX-License-Identifier: Apache-2.0

//! Fixed user, review and inventory documents.
//!
//! Reviews and inventory items point at relational product ids and at
//! `users.user_id` by value only; nothing enforces those links.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::engine::error::EngineResult;

use super::bson_date;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub user_id: i32,
    pub username: String,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub interests: Vec<String>,
    pub address: Address,
    pub premium_member: bool,
    pub joined_date: DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDocument {
    pub review_id: i32,
    pub product_id: i32,
    pub user_id: i32,
    pub rating: f64,
    pub review_text: String,
    pub verified_purchase: bool,
    pub review_date: DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_id: i32,
    pub quantity: i32,
    pub last_updated: DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryDocument {
    pub warehouse_id: String,
    pub location: String,
    pub items: Vec<InventoryItem>,
}

struct UserRow {
    user_id: i32,
    username: &'static str,
    name: &'static str,
    email: &'static str,
    age: i32,
    interests: &'static [&'static str],
    address: [&'static str; 4],
    premium_member: bool,
    joined_date: &'static str,
}

const USERS: [UserRow; 5] = [
    UserRow {
        user_id: 1,
        username: "tech_guru",
        name: "Alex Chen",
        email: "alex@example.com",
        age: 28,
        interests: &["programming", "machine learning", "hiking"],
        address: ["123 Tech Lane", "San Francisco", "CA", "94105"],
        premium_member: true,
        joined_date: "2022-03-15",
    },
    UserRow {
        user_id: 2,
        username: "design_star",
        name: "Sofia Rodriguez",
        email: "sofia@example.com",
        age: 34,
        interests: &["design", "photography", "travel"],
        address: ["456 Creative Ave", "New York", "NY", "10001"],
        premium_member: true,
        joined_date: "2021-07-22",
    },
    UserRow {
        user_id: 3,
        username: "music_lover",
        name: "James Wilson",
        email: "james@example.com",
        age: 25,
        interests: &["music", "concerts", "guitars"],
        address: ["789 Melody Road", "Nashville", "TN", "37203"],
        premium_member: false,
        joined_date: "2023-01-10",
    },
    UserRow {
        user_id: 4,
        username: "food_explorer",
        name: "Aisha Johnson",
        email: "aisha@example.com",
        age: 31,
        interests: &["cooking", "food", "travel", "blogging"],
        address: ["101 Flavor Street", "Chicago", "IL", "60607"],
        premium_member: true,
        joined_date: "2022-11-05",
    },
    UserRow {
        user_id: 5,
        username: "fitness_coach",
        name: "Marcus Brown",
        email: "marcus@example.com",
        age: 29,
        interests: &["fitness", "nutrition", "running"],
        address: ["202 Wellness Way", "Los Angeles", "CA", "90001"],
        premium_member: false,
        joined_date: "2023-04-18",
    },
];

struct ReviewRow {
    review_id: i32,
    product_id: i32,
    user_id: i32,
    rating: f64,
    text: &'static str,
    verified: bool,
    date: &'static str,
}

const REVIEWS: [ReviewRow; 7] = [
    ReviewRow {
        review_id: 1,
        product_id: 1,
        user_id: 1,
        rating: 4.5,
        text: "Great laptop overall. Fast performance and good battery life.",
        verified: true,
        date: "2024-02-15",
    },
    ReviewRow {
        review_id: 2,
        product_id: 2,
        user_id: 3,
        rating: 5.0,
        text: "Excellent sound quality and very comfortable for long periods.",
        verified: true,
        date: "2024-01-20",
    },
    ReviewRow {
        review_id: 3,
        product_id: 3,
        user_id: 4,
        rating: 3.5,
        text: "Makes good coffee but a bit loud in operation.",
        verified: true,
        date: "2024-03-05",
    },
    ReviewRow {
        review_id: 4,
        product_id: 6,
        user_id: 2,
        rating: 4.0,
        text: "Great camera and screen. Battery could be better.",
        verified: false,
        date: "2024-02-28",
    },
    ReviewRow {
        review_id: 5,
        product_id: 8,
        user_id: 5,
        rating: 4.8,
        text: "Perfect thickness and very durable. Highly recommend!",
        verified: true,
        date: "2024-01-10",
    },
    ReviewRow {
        review_id: 6,
        product_id: 1,
        user_id: 2,
        rating: 4.0,
        text: "Good performance but runs a bit hot under load.",
        verified: true,
        date: "2024-03-10",
    },
    ReviewRow {
        review_id: 7,
        product_id: 5,
        user_id: 4,
        rating: 2.5,
        text: "Not very powerful and struggles with harder ingredients.",
        verified: true,
        date: "2024-02-05",
    },
];

// (product_id, quantity, last_updated)
type StockRow = (i32, i32, &'static str);

const INVENTORY: [(&str, &str, [StockRow; 3]); 4] = [
    (
        "W001",
        "San Francisco",
        [(1, 15, "2024-03-01"), (2, 28, "2024-03-05"), (6, 12, "2024-03-10")],
    ),
    (
        "W002",
        "Chicago",
        [(3, 8, "2024-02-28"), (4, 20, "2024-03-08"), (7, 35, "2024-03-12")],
    ),
    (
        "W003",
        "Atlanta",
        [(5, 0, "2024-03-02"), (8, 42, "2024-03-15"), (9, 56, "2024-03-10")],
    ),
    (
        "W004",
        "Los Angeles",
        [(10, 0, "2024-02-25"), (1, 10, "2024-03-14"), (4, 15, "2024-03-07")],
    ),
];

pub const USER_COUNT: usize = USERS.len();
pub const REVIEW_COUNT: usize = REVIEWS.len();
pub const WAREHOUSE_COUNT: usize = INVENTORY.len();

/// `user_id` of every fixture user, in insertion order.
pub fn user_ids() -> impl Iterator<Item = i32> {
    USERS.iter().map(|u| u.user_id)
}

pub fn users() -> EngineResult<Vec<UserDocument>> {
    USERS
        .iter()
        .map(|u| {
            let [street, city, state, zip] = u.address;
            Ok(UserDocument {
                user_id: u.user_id,
                username: u.username.to_string(),
                name: u.name.to_string(),
                email: u.email.to_string(),
                age: u.age,
                interests: u.interests.iter().map(|s| s.to_string()).collect(),
                address: Address {
                    street: street.to_string(),
                    city: city.to_string(),
                    state: state.to_string(),
                    zip: zip.to_string(),
                },
                premium_member: u.premium_member,
                joined_date: bson_date(u.joined_date)?,
            })
        })
        .collect()
}

pub fn reviews() -> EngineResult<Vec<ReviewDocument>> {
    REVIEWS
        .iter()
        .map(|r| {
            Ok(ReviewDocument {
                review_id: r.review_id,
                product_id: r.product_id,
                user_id: r.user_id,
                rating: r.rating,
                review_text: r.text.to_string(),
                verified_purchase: r.verified,
                review_date: bson_date(r.date)?,
            })
        })
        .collect()
}

pub fn inventory() -> EngineResult<Vec<InventoryDocument>> {
    INVENTORY
        .iter()
        .map(|(warehouse_id, location, stock)| {
            let items = stock
                .iter()
                .map(|&(product_id, quantity, date)| {
                    Ok(InventoryItem {
                        product_id,
                        quantity,
                        last_updated: bson_date(date)?,
                    })
                })
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(InventoryDocument {
                warehouse_id: warehouse_id.to_string(),
                location: location.to_string(),
                items,
            })
        })
        .collect()
}
