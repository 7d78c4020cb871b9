//! Conversion from hub snapshots and domain entities to HTTP DTOs.

use crate::{
    domain::User,
    hub::{HouseSnapshot, RoomSnapshot, ServerStats},
    infrastructure::dto::http::{
        HealthDto, HouseDetailDto, HouseSummaryDto, MemberDto, RoomDetailDto,
    },
};

impl From<&User> for MemberDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
        }
    }
}

impl From<&HouseSnapshot> for HouseSummaryDto {
    fn from(house: &HouseSnapshot) -> Self {
        Self {
            id: house.id.to_string(),
            name: house.name.to_string(),
            private: house.private,
            member_count: house.members.len(),
            room_count: house.rooms.len(),
        }
    }
}

impl From<RoomSnapshot> for RoomDetailDto {
    fn from(room: RoomSnapshot) -> Self {
        Self {
            id: room.id.to_string(),
            name: room.name.to_string(),
            private: room.private,
            members: room.members.iter().map(MemberDto::from).collect(),
        }
    }
}

impl From<HouseSnapshot> for HouseDetailDto {
    fn from(house: HouseSnapshot) -> Self {
        Self {
            id: house.id.to_string(),
            name: house.name.to_string(),
            private: house.private,
            members: house.members.iter().map(MemberDto::from).collect(),
            rooms: house.rooms.into_iter().map(RoomDetailDto::from).collect(),
        }
    }
}

impl From<ServerStats> for HealthDto {
    fn from(stats: ServerStats) -> Self {
        Self {
            status: "ok".to_string(),
            clients: stats.clients,
            houses: stats.houses,
            known_users: stats.known_users,
            dropped_frames: stats.dropped_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HouseId, HouseName, RoomId, RoomName, UserId};

    fn snapshot() -> HouseSnapshot {
        let alice = User::new(UserId::generate(), "alice");
        let bob = User::new(UserId::generate(), "bob");
        HouseSnapshot {
            id: HouseId::generate(),
            name: HouseName::new("general".to_string()).unwrap(),
            private: false,
            members: vec![alice.clone(), bob],
            rooms: vec![RoomSnapshot {
                id: RoomId::generate(),
                name: RoomName::new("lobby".to_string()).unwrap(),
                private: false,
                members: vec![alice],
            }],
        }
    }

    #[test]
    fn test_house_snapshot_to_summary() {
        // テスト項目: ハウスのスナップショットが一覧用 DTO に変換される
        // given (前提条件):
        let house = snapshot();

        // when (操作):
        let dto = HouseSummaryDto::from(&house);

        // then (期待する結果):
        assert_eq!(dto.id, house.id.to_string());
        assert_eq!(dto.name, "general");
        assert_eq!(dto.member_count, 2);
        assert_eq!(dto.room_count, 1);
    }

    #[test]
    fn test_house_snapshot_to_detail() {
        // テスト項目: ハウスのスナップショットがメンバーとルームを含む詳細 DTO に変換される
        // given (前提条件):
        let house = snapshot();
        let alice_id = house.members[0].id.to_string();

        // when (操作):
        let dto = HouseDetailDto::from(house);

        // then (期待する結果):
        assert_eq!(dto.members.len(), 2);
        assert_eq!(dto.members[0].name, "alice");
        assert_eq!(dto.rooms[0].name, "lobby");
        assert_eq!(dto.rooms[0].members[0].id, alice_id);
    }

    #[test]
    fn test_stats_to_health() {
        // テスト項目: サーバー統計がヘルスチェック DTO に変換される
        // given (前提条件):
        let stats = ServerStats {
            clients: 3,
            houses: 2,
            known_users: 5,
            dropped_frames: 7,
        };

        // when (操作):
        let dto = HealthDto::from(stats);

        // then (期待する結果):
        assert_eq!(dto.status, "ok");
        assert_eq!(dto.clients, 3);
        assert_eq!(dto.known_users, 5);
        assert_eq!(dto.dropped_frames, 7);
    }
}
