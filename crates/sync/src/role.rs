/// Where this peer stands relative to one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NetworkRole {
    #[default]
    None,
    /// Simulates the vehicle and publishes its state.
    Owner,
    /// Dedicated or listen server relaying a player-driven vehicle.
    Server,
    /// Observer of a vehicle owned elsewhere.
    Client,
    /// Has authority over a client-spawned vehicle that nobody possesses.
    ClientSpawned,
}

impl NetworkRole {
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Every role except the owner replays received states.
    pub fn plays_back(&self) -> bool {
        !self.is_owner()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkRole::None => "none",
            NetworkRole::Owner => "owner",
            NetworkRole::Server => "server",
            NetworkRole::Client => "client",
            NetworkRole::ClientSpawned => "client-spawned",
        }
    }
}

/// Raw replication facts a host engine knows about a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleFacts {
    pub locally_controlled: bool,
    pub is_server: bool,
    pub player_controlled: bool,
    pub has_authority: bool,
}

impl RoleFacts {
    pub fn classify(&self) -> NetworkRole {
        if self.locally_controlled {
            NetworkRole::Owner
        } else if self.is_server {
            if self.player_controlled {
                NetworkRole::Server
            } else {
                NetworkRole::Owner
            }
        } else if self.has_authority {
            NetworkRole::ClientSpawned
        } else {
            NetworkRole::Client
        }
    }
}

/// Live role query. Consulted every tick; never cached.
pub trait RoleSource {
    fn network_role(&self) -> NetworkRole;
}

impl RoleSource for NetworkRole {
    fn network_role(&self) -> NetworkRole {
        *self
    }
}

impl RoleSource for RoleFacts {
    fn network_role(&self) -> NetworkRole {
        self.classify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        let facts = |locally_controlled, is_server, player_controlled, has_authority| RoleFacts {
            locally_controlled,
            is_server,
            player_controlled,
            has_authority,
        };

        assert_eq!(facts(true, true, true, true).classify(), NetworkRole::Owner);
        assert_eq!(facts(false, true, true, true).classify(), NetworkRole::Server);
        assert_eq!(facts(false, true, false, true).classify(), NetworkRole::Owner);
        assert_eq!(
            facts(false, false, false, true).classify(),
            NetworkRole::ClientSpawned
        );
        assert_eq!(facts(false, false, true, false).classify(), NetworkRole::Client);
    }

    #[test]
    fn only_non_owners_play_back() {
        assert!(!NetworkRole::Owner.plays_back());
        assert!(NetworkRole::Server.plays_back());
        assert!(NetworkRole::Client.plays_back());
        assert!(NetworkRole::ClientSpawned.plays_back());
    }
}
