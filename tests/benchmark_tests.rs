//! Performance benchmarks for the parsing hot paths

use monitor::players::parse_player_count;
use monitor::server_build::extract_remote_buildid;
use monitor::vdf::extract_branch_block;
use monitor::workshop::parse_workshop_ids;
use shared::{Packet, SERVERDATA_RESPONSE_VALUE};
use std::time::Instant;

/// Builds an app_info dump shaped like real steamcmd output, with many depots
/// ahead of the branches block
fn large_appinfo(depots: usize) -> String {
    let mut text = String::from("\"380870\"\n{\n\t\"common\"\n\t{\n\t\t\"name\"\t\t\"Project Zomboid Dedicated Server\"\n\t}\n\t\"depots\"\n\t{\n");
    for i in 0..depots {
        text.push_str(&format!(
            "\t\t\"{}\"\n\t\t{{\n\t\t\t\"manifests\"\n\t\t\t{{\n\t\t\t\t\"public\"\t\t\"{}\"\n\t\t\t}}\n\t\t}}\n",
            380_871 + i,
            9_000_000_000u64 + i as u64
        ));
    }
    text.push_str("\t\t\"branches\"\n\t\t{\n");
    for (name, build) in [("public", 14_000_001), ("unstable", 14_000_002), ("iwbums", 13_999_000)] {
        text.push_str(&format!(
            "\t\t\t\"{}\"\n\t\t\t{{\n\t\t\t\t\"buildid\"\t\t\"{}\"\n\t\t\t\t\"timeupdated\"\t\t\"1700000000\"\n\t\t\t}}\n",
            name, build
        ));
    }
    text.push_str("\t\t}\n\t}\n}\n");
    text
}

/// Benchmarks RCON frame encode/decode
#[test]
fn benchmark_packet_codec() {
    let body = "Players connected (3):\n-Alice\n-Bob\n-Carol\n".repeat(20);
    let packet = Packet::new(2, SERVERDATA_RESPONSE_VALUE, body);

    let iterations = 20_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let frame = packet.encode();
        let (decoded, consumed) = Packet::decode(&frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(decoded.id, 2);
    }

    let duration = start.elapsed();
    println!(
        "Packet codec: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks branch-scoped buildid extraction over a large dump
#[test]
fn benchmark_buildid_extraction() {
    let text = large_appinfo(200);

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        assert!(extract_branch_block(&text, "unstable").is_some());
        assert_eq!(
            extract_remote_buildid(&text, "unstable").as_deref(),
            Some("14000002")
        );
    }

    let duration = start.elapsed();
    println!(
        "Buildid extraction: {} iterations over {} bytes in {:?} ({:.2} μs/iter)",
        iterations,
        text.len(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks player listing parsing for a full server
#[test]
fn benchmark_player_listing() {
    let mut listing = String::from("Players connected (100):\n");
    for i in 0..100 {
        listing.push_str(&format!("-Survivor{}\n", i));
    }
    let headerless = listing.replacen("Players connected (100):\n", "", 1);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        assert_eq!(parse_player_count(&listing), Some(100));
        assert_eq!(parse_player_count(&headerless), Some(100));
    }

    let duration = start.elapsed();
    println!(
        "Player listing: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 3 seconds
    assert!(duration.as_millis() < 3000);
}

/// Stress tests workshop id parsing with a large, messy mod list
#[test]
fn stress_test_workshop_ids() {
    let ids: Vec<String> = (0..2_000).map(|i| (2_000_000_000u64 + i % 1_500).to_string()).collect();
    let ini = format!(
        "PVP=true\nMods=a;b;c\nWorkshopItems={};junk;;\nPublic=false\n",
        ids.join(";")
    );

    let start = Instant::now();

    let parsed = parse_workshop_ids(&ini);

    let duration = start.elapsed();
    println!("Workshop ids: {} entries in {:?}", parsed.len(), duration);

    assert_eq!(parsed.len(), 1_500);
    assert_eq!(parsed[0], "2000000000");

    // Should complete in under 500ms
    assert!(duration.as_millis() < 500);
}
