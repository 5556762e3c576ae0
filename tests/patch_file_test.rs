// File-level patch tests: read a module from disk, patch it, write it back

use std::fs;

use spvpatch::config::{PatchConfig, Target};
use spvpatch::spirv::{AddressingModel, Capability, Op};
use spvpatch::test_utils::{find_ops, ModuleBuilder};
use spvpatch::words::{read_words, words_to_bytes, write_words};
use spvpatch::{ParsedModule, PatchError, Patcher};

fn scenario_words() -> Vec<u32> {
    let mut builder = ModuleBuilder::new().capability(Capability::Shader);
    let file = builder.source_file("shader.frag");
    builder.function("F", &["v1", "v2"], &[(file, 20)]);
    builder.build()
}

#[test]
fn test_patch_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.spv");
    let output = dir.path().join("out.spv");
    write_words(&input, &scenario_words()).unwrap();

    let module = ParsedModule::parse(read_words(&input).unwrap()).unwrap();
    let config = PatchConfig {
        output: output.clone(),
        ..PatchConfig::default()
    };
    let outcome = Patcher::new(config).patch(&module).unwrap();
    outcome.write(&output).unwrap();

    // exact bytes on disk
    assert_eq!(fs::read(&output).unwrap(), words_to_bytes(&outcome.words));

    let patched = ParsedModule::parse(read_words(&output).unwrap()).unwrap();
    assert_eq!(patched.addressing_model(), AddressingModel::PhysicalStorageBuffer64);
    assert_eq!(find_ops(&patched.words, Op::Capability).len(), 2);
    assert_eq!(find_ops(&patched.words, Op::Extension).len(), 1);
    assert_eq!(patched.functions[0].name, "F");

    // input file untouched
    assert_eq!(read_words(&input).unwrap(), scenario_words());
}

#[test]
fn test_failed_patch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.spv");
    let module = ParsedModule::parse(scenario_words()).unwrap();

    let config = PatchConfig {
        target: Target { file: 0, line: 99 },
        output: output.clone(),
        ..PatchConfig::default()
    };
    let result = Patcher::new(config).patch(&module);
    assert!(matches!(result, Err(PatchError::LineNotFound(0, 99))));
    assert!(!output.exists());
}

#[test]
fn test_existing_output_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.spv");
    fs::write(&output, vec![0xAAu8; 4096]).unwrap();

    let module = ParsedModule::parse(scenario_words()).unwrap();
    let outcome = Patcher::new(PatchConfig::default()).patch(&module).unwrap();
    outcome.write(&output).unwrap();

    assert_eq!(read_words(&output).unwrap(), outcome.words);
}
