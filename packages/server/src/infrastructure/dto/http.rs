//! HTTP API request and response bodies.

use serde::{Deserialize, Serialize};

/// `POST /api/login` body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Error body shared by the API endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDto {
    pub status: String,
}

impl StatusDto {
    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
        }
    }
}

/// `GET /api/health` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
    pub clients: usize,
    pub houses: usize,
    pub known_users: usize,
    pub dropped_frames: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: String,
    pub name: String,
}

/// Entry of `GET /api/houses`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseSummaryDto {
    pub id: String,
    pub name: String,
    pub private: bool,
    pub member_count: usize,
    pub room_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub name: String,
    pub private: bool,
    pub members: Vec<MemberDto>,
}

/// `GET /api/houses/{house_id}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseDetailDto {
    pub id: String,
    pub name: String,
    pub private: bool,
    pub members: Vec<MemberDto>,
    pub rooms: Vec<RoomDetailDto>,
}
