// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! A small plant address space used across the integration tests.
//!
//! ```text
//! Objects (i=85)
//! ├── Pump1.Speed    ns=<plant>;s=Pump1.Speed    1400 + 10*minute
//! ├── Pump1.Temp     ns=<plant>;s=Pump1.Temp     40 + minute
//! └── Line2.Counter  ns=<line2>;i=1001           minute
//!
//! Server (i=2253) events at minutes 1, 3, 5 with Severity 200, 500, 800
//! ```
//!
//! History covers minutes 0..=9 of 2025-01-01 UTC.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use uaq_opcua::{
    DataValue, MemoryEvent, MemoryServer, NamespaceTable, NodeId, OpcUaValue, PortableNodeId,
    QualifiedName,
};

/// Plant namespace URI.
pub const PLANT_NS: &str = "urn:example:plant";

/// Second line namespace URI.
pub const LINE_NS: &str = "urn:example:line2";

/// Number of history samples per variable.
pub const HISTORY_MINUTES: u32 = 10;

// =============================================================================
// Time Helpers
// =============================================================================

/// Returns 2025-01-01T00:`minute`:00Z.
pub fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .map(|base| base + chrono::Duration::minutes(i64::from(minute)))
        .expect("valid fixture timestamp")
}

/// Returns [`ts`] as Unix milliseconds.
pub fn epoch_ms(minute: u32) -> i64 {
    ts(minute).timestamp_millis()
}

// =============================================================================
// Plant Fixture
// =============================================================================

/// The plant address space.
pub struct PlantFixture;

impl PlantFixture {
    /// Builds the server with the plant namespace at index 1.
    pub fn server() -> MemoryServer {
        Self::server_with(NamespaceTable::from_uris([PLANT_NS, LINE_NS]))
    }

    /// Builds the same address space with the namespace table reversed.
    ///
    /// Native indices differ from [`PlantFixture::server`]; portable ids
    /// resolve to the same nodes on both.
    pub fn server_reordered() -> MemoryServer {
        Self::server_with(NamespaceTable::from_uris([LINE_NS, PLANT_NS]))
    }

    fn server_with(namespaces: NamespaceTable) -> MemoryServer {
        let plant = index_in(&namespaces, PLANT_NS);
        let line = index_in(&namespaces, LINE_NS);
        let server = MemoryServer::new(namespaces);

        let speed = NodeId::string(plant, "Pump1.Speed");
        let temp = NodeId::string(plant, "Pump1.Temp");
        let counter = NodeId::numeric(line, 1001);

        server.add_variable(
            speed.clone(),
            QualifiedName::new(plant, "Pump1.Speed"),
            OpcUaValue::Double(1450.0),
        );
        server.add_variable(
            temp.clone(),
            QualifiedName::new(plant, "Pump1.Temp"),
            OpcUaValue::Double(49.0),
        );
        server.add_variable(
            counter.clone(),
            QualifiedName::new(line, "Line2.Counter"),
            OpcUaValue::Int64(9),
        );

        for minute in 0..HISTORY_MINUTES {
            let m = f64::from(minute);
            server.append_history(&speed, DataValue::at(OpcUaValue::Double(1400.0 + 10.0 * m), ts(minute)));
            server.append_history(&temp, DataValue::at(OpcUaValue::Double(40.0 + m), ts(minute)));
            server.append_history(&counter, DataValue::at(OpcUaValue::Int64(i64::from(minute)), ts(minute)));
        }

        for (minute, severity, message) in [(1, 200, "Pump started"), (3, 500, "Pressure high"), (5, 800, "Overheat")] {
            server.add_event(
                &NodeId::SERVER,
                MemoryEvent::new(ts(minute))
                    .with_field("Message", OpcUaValue::String(message.to_string()))
                    .with_field("Severity", OpcUaValue::UInt16(severity)),
            );
        }

        server
    }

    /// Portable id of `Pump1.Speed`.
    pub fn pump_speed() -> String {
        portable_string("Pump1.Speed", PLANT_NS)
    }

    /// Portable id of `Pump1.Temp`.
    pub fn pump_temp() -> String {
        portable_string("Pump1.Temp", PLANT_NS)
    }

    /// Portable id of `Line2.Counter`.
    pub fn line_counter() -> String {
        portable_numeric(1001, LINE_NS)
    }

    /// Portable id of a node that does not exist.
    pub fn missing_node() -> String {
        portable_string("Nope", PLANT_NS)
    }

    /// Native id of the Server object, the event notifier.
    pub fn server_node() -> String {
        "i=2253".to_string()
    }

    /// The address space as a fixture document.
    pub fn fixture_json() -> serde_json::Value {
        let history = |f: &dyn Fn(u32) -> serde_json::Value| {
            (0..HISTORY_MINUTES)
                .map(|minute| json!({ "timestamp": ts(minute).to_rfc3339(), "value": f(minute) }))
                .collect::<Vec<_>>()
        };
        json!({
            "namespaces": [PLANT_NS, LINE_NS],
            "nodes": [
                { "nodeId": "ns=1;s=Pump1.Speed", "browseName": "1:Pump1.Speed", "value": 1450.0,
                  "history": history(&|m| json!(1400.0 + 10.0 * f64::from(m))) },
                { "nodeId": "ns=1;s=Pump1.Temp", "browseName": "1:Pump1.Temp", "value": 49.0,
                  "history": history(&|m| json!(40.0 + f64::from(m))) },
                { "nodeId": "ns=2;i=1001", "browseName": "2:Line2.Counter", "value": 9,
                  "history": history(&|m| json!(m)) }
            ],
            "events": [
                { "notifier": "i=2253", "time": ts(1).to_rfc3339(),
                  "fields": { "Message": "Pump started", "Severity": 200 } },
                { "notifier": "i=2253", "time": ts(3).to_rfc3339(),
                  "fields": { "Message": "Pressure high", "Severity": 500 } },
                { "notifier": "i=2253", "time": ts(5).to_rfc3339(),
                  "fields": { "Message": "Overheat", "Severity": 800 } }
            ]
        })
    }

    /// Writes [`PlantFixture::fixture_json`] to `dir/plant.json`.
    pub fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("plant.json");
        std::fs::write(&path, Self::fixture_json().to_string()).expect("write fixture");
        path
    }
}

fn index_in(namespaces: &NamespaceTable, uri: &str) -> u16 {
    namespaces
        .iter()
        .position(|u| u == uri)
        .and_then(|i| u16::try_from(i).ok())
        .expect("fixture namespace present")
}

/// Portable JSON for a string identifier.
pub fn portable_string(id: &str, namespace_url: &str) -> String {
    format!(r#"{{"id":"s={}","namespaceUrl":"{}"}}"#, id, namespace_url)
}

/// Portable JSON for a numeric identifier.
pub fn portable_numeric(id: u32, namespace_url: &str) -> String {
    format!(r#"{{"id":"i={}","namespaceUrl":"{}"}}"#, id, namespace_url)
}

/// Portable JSON of `node_id` as seen by `namespaces`.
pub fn portable_of(node_id: &NodeId, namespaces: &NamespaceTable) -> String {
    PortableNodeId::from_native(node_id, namespaces)
        .and_then(|p| p.to_json())
        .expect("node id encodable")
}
