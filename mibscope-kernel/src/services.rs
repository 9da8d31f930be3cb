//! Static service inventory shown on the dashboard's services card.

use crate::config::AgentStatus;
use crate::models::ServiceEntry;

const SERVICES: [(&str, &str, AgentStatus, &str, u16, &str); 5] = [
    ("Web Server", "192.168.1.100", AgentStatus::Up, "5d 12h 30m", 80, "HTTP"),
    ("Database Server", "192.168.1.101", AgentStatus::Up, "12d 8h 15m", 3306, "MySQL"),
    ("Cache Server", "192.168.1.102", AgentStatus::Down, "0d 0h 0m", 6379, "Redis"),
    ("Load Balancer", "192.168.1.103", AgentStatus::Up, "3d 6h 45m", 443, "NGINX"),
    ("Message Queue", "192.168.1.104", AgentStatus::Up, "7d 2h 20m", 5672, "RabbitMQ"),
];

pub fn service_table() -> Vec<ServiceEntry> {
    SERVICES
        .iter()
        .map(|&(name, ip, status, uptime, port, kind)| ServiceEntry {
            name: name.into(),
            ip: ip.into(),
            status,
            uptime: uptime.into(),
            port,
            kind: kind.into(),
        })
        .collect()
}
