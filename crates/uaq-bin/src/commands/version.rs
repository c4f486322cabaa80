// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use uaq_query::ReadType;

use crate::cli::Cli;
use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("UAQ - OPC UA query translation layer");
    println!();
    println!("Version Information:");
    println!("  uaq-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  uaq-query:  {}", uaq_query::VERSION);
    println!("  uaq-opcua:  {}", uaq_opcua::VERSION);
    println!("  uaq-config: {}", uaq_config::VERSION);
    println!();
    println!("Build Information:");
    println!("  Rust Edition: 2024");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("Read types:");
    for read_type in ReadType::ALL {
        println!("  {}", read_type);
    }
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
