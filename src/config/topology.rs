//! Port topology for a local cluster
//!
//! Node ids are 1-based. Node `i` listens for clients on `base_port + i - 1`
//! and for controller traffic on `base_controller_port + i - 1`.

use serde::{Deserialize, Serialize};

use super::SettingsError;

/// Host every local node binds and advertises
pub const LOCAL_HOST: &str = "localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    node_count: u16,
    base_port: u16,
    base_controller_port: u16,
}

impl Topology {
    /// Build a topology, rejecting port ranges that overflow or collide
    pub fn new(
        node_count: u16,
        base_port: u16,
        base_controller_port: u16,
    ) -> Result<Self, SettingsError> {
        if node_count == 0 {
            return Err(SettingsError::NoNodes);
        }

        let broker = port_range(base_port, node_count)?;
        let controller = port_range(base_controller_port, node_count)?;
        if broker.0 <= controller.1 && controller.0 <= broker.1 {
            return Err(SettingsError::PortOverlap { broker, controller });
        }

        Ok(Self {
            node_count,
            base_port,
            base_controller_port,
        })
    }

    pub fn node_count(&self) -> u16 {
        self.node_count
    }

    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    pub fn base_controller_port(&self) -> u16 {
        self.base_controller_port
    }

    /// Node ids in ascending order
    pub fn node_ids(&self) -> impl Iterator<Item = u16> {
        1..=self.node_count
    }

    /// Client listener port of node `node_id`
    pub fn broker_port(&self, node_id: u16) -> u16 {
        self.base_port + (node_id - 1)
    }

    /// Controller listener port of node `node_id`
    pub fn controller_port(&self, node_id: u16) -> u16 {
        self.base_controller_port + (node_id - 1)
    }

    pub fn broker_endpoint(&self, node_id: u16) -> String {
        format!("{}:{}", LOCAL_HOST, self.broker_port(node_id))
    }

    pub fn controller_endpoint(&self, node_id: u16) -> String {
        format!("{}:{}", LOCAL_HOST, self.controller_port(node_id))
    }

    pub fn broker_endpoints(&self) -> Vec<String> {
        self.node_ids().map(|n| self.broker_endpoint(n)).collect()
    }

    pub fn controller_endpoints(&self) -> Vec<String> {
        self.node_ids().map(|n| self.controller_endpoint(n)).collect()
    }

    /// Comma-separated broker list for `bootstrap.servers`
    pub fn bootstrap_servers(&self) -> String {
        self.broker_endpoints().join(",")
    }

    /// First broker, used as the bootstrap server for admin tools
    pub fn first_broker(&self) -> String {
        self.broker_endpoint(1)
    }

    /// `controller.quorum.voters` value: every node's controller endpoint
    pub fn quorum_voters(&self) -> String {
        self.node_ids()
            .map(|n| format!("{}@{}", n, self.controller_endpoint(n)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn port_range(base: u16, nodes: u16) -> Result<(u16, u16), SettingsError> {
    let last = base
        .checked_add(nodes - 1)
        .ok_or(SettingsError::PortOverflow { base, nodes })?;
    Ok((base, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_lab_layout() {
        let topology = Topology::new(3, 9092, 9029).unwrap();
        assert_eq!(
            topology.broker_endpoints(),
            vec!["localhost:9092", "localhost:9093", "localhost:9094"]
        );
        assert_eq!(
            topology.quorum_voters(),
            "1@localhost:9029,2@localhost:9030,3@localhost:9031"
        );
        assert_eq!(
            topology.bootstrap_servers(),
            "localhost:9092,localhost:9093,localhost:9094"
        );
    }

    #[test]
    fn test_ports_are_distinct_for_any_size() {
        for n in 1..=40u16 {
            let topology = Topology::new(n, 9092, 9029 - 40).unwrap();
            let brokers = topology.broker_endpoints();
            let controllers = topology.controller_endpoints();
            assert_eq!(brokers.len(), n as usize);
            assert_eq!(controllers.len(), n as usize);

            let ports: HashSet<u16> = topology
                .node_ids()
                .flat_map(|id| [topology.broker_port(id), topology.controller_port(id)])
                .collect();
            assert_eq!(ports.len(), 2 * n as usize);
        }
    }

    #[test]
    fn test_zero_nodes_rejected() {
        assert_eq!(Topology::new(0, 9092, 9029), Err(SettingsError::NoNodes));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let err = Topology::new(5, 9092, 9094).unwrap_err();
        assert!(matches!(err, SettingsError::PortOverlap { .. }));
    }

    #[test]
    fn test_port_overflow_rejected() {
        let err = Topology::new(3, u16::MAX - 1, 9029).unwrap_err();
        assert!(matches!(err, SettingsError::PortOverflow { .. }));
    }
}
