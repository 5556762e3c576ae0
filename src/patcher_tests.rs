// Patch orchestration tests

#[cfg(test)]
mod tests {
    use crate::config::{PatchConfig, Target};
    use crate::encoder::{decode_literal_string, InstructionBuilder};
    use crate::error::PatchError;
    use crate::instruction::Instructions;
    use crate::locator::{InexactLinePolicy, LineMatch};
    use crate::module::{ParsedModule, Preamble, SectionOffsets};
    use crate::patcher::{enable_physical_addressing, Inserted, Patcher};
    use crate::spirv::{
        AddressingModel, Capability, Op, PHYSICAL_STORAGE_BUFFER_EXTENSION,
    };
    use crate::test_utils::{find_ops, ModuleBuilder};
    use test_log::test;

    const PSB_CAP: u32 = 5347;

    fn config_for(file: usize, line: u32) -> PatchConfig {
        PatchConfig {
            target: Target { file, line },
            ..PatchConfig::default()
        }
    }

    /// One file, one marker at line 20 in F with locals v1, v2
    fn scenario_module() -> ParsedModule {
        let mut builder = ModuleBuilder::new();
        let file = builder.source_file("scenario.frag");
        builder.function("F", &["v1", "v2"], &[(file, 20)]);
        ParsedModule::parse(builder.build()).unwrap()
    }

    /// Module with every preamble section populated
    fn populated_module() -> ParsedModule {
        let mut builder = ModuleBuilder::new()
            .capability(Capability::Shader)
            .capability(Capability::Int64)
            .extension("SPV_KHR_storage_buffer_storage_class")
            .ext_inst_import("GLSL.std.450");
        let file = builder.source_file("populated.comp");
        builder.function("main", &["idx"], &[(file, 11), (file, 14)]);
        ParsedModule::parse(builder.build()).unwrap()
    }

    fn extensions(words: &[u32]) -> Vec<String> {
        Preamble::scan(words).unwrap().extensions
    }

    fn capabilities(words: &[u32]) -> Vec<u32> {
        Preamble::scan(words).unwrap().capabilities
    }

    /// Preamble instructions appear in logical layout order:
    /// capabilities, extensions, imports, memory model
    fn preamble_well_ordered(words: &[u32]) -> bool {
        let mut last_rank = 0;
        for instr in Instructions::new(words) {
            let Ok(instr) = instr else {
                return false;
            };
            let rank = match instr.op() {
                Some(Op::Capability) => 0,
                Some(Op::Extension) => 1,
                Some(Op::ExtInstImport) => 2,
                Some(Op::MemoryModel) => return true,
                _ => continue,
            };
            if rank < last_rank {
                return false;
            }
            last_rank = rank;
        }
        false
    }

    #[test]
    fn test_end_to_end_scenario() {
        let module = scenario_module();
        let outcome = Patcher::new(config_for(0, 20)).patch(&module).unwrap();

        let patched = ParsedModule::parse(outcome.words.clone()).unwrap();
        assert_eq!(patched.addressing_model(), AddressingModel::PhysicalStorageBuffer64);
        assert_eq!(outcome.previous_addressing, AddressingModel::Logical);

        assert_eq!(find_ops(&outcome.words, Op::Extension).len(), 1);
        assert_eq!(extensions(&outcome.words), vec![PHYSICAL_STORAGE_BUFFER_EXTENSION]);
        assert_eq!(find_ops(&outcome.words, Op::Capability).len(), 1);
        assert_eq!(capabilities(&outcome.words), vec![PSB_CAP]);
        assert!(preamble_well_ordered(&outcome.words));

        let location = &outcome.location;
        assert_eq!(location.matched, LineMatch::Exact);
        assert_eq!(location.function_name, "F");
        let names: Vec<&str> = location.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["v1", "v2"]);

        // capability (2 words) + extension (1 + 8 words)
        assert_eq!(outcome.words.len(), module.words.len() + 2 + 9);
    }

    #[test]
    fn test_original_module_untouched() {
        let module = scenario_module();
        let before = module.words.clone();
        let outcome = Patcher::new(config_for(0, 20)).patch(&module).unwrap();
        assert_ne!(outcome.words, before);
        assert_eq!(module.words, before);
        assert_eq!(module.addressing_model(), AddressingModel::Logical);

        // the same parsed module can be patched again independently
        let again = Patcher::new(config_for(0, 20)).patch(&module).unwrap();
        assert_eq!(again.words, outcome.words);
    }

    #[test]
    fn test_insertions_do_not_use_stale_offsets() {
        let module = populated_module();
        let stale = module.sections;
        assert!(stale.capabilities < stale.extensions);

        // Ascending order with offsets captured up front: the capability
        // lands first and pushes the extension section back, so the
        // extension is written in front of the old capabilities.
        let mut naive = module.words.clone();
        InstructionBuilder::new(Op::Capability)
            .push(Capability::PhysicalStorageBufferAddresses)
            .insert(&mut naive, stale.capabilities);
        InstructionBuilder::new(Op::Extension)
            .push_str(PHYSICAL_STORAGE_BUFFER_EXTENSION)
            .insert(&mut naive, stale.extensions);
        assert!(!preamble_well_ordered(&naive));

        let outcome = Patcher::new(config_for(0, 11)).patch(&module).unwrap();
        let words = &outcome.words;
        assert!(preamble_well_ordered(words));
        assert_eq!(
            outcome.inserted,
            vec![
                Inserted {
                    op: Op::Extension,
                    offset: stale.extensions,
                    words: 9,
                },
                Inserted {
                    op: Op::Capability,
                    offset: stale.capabilities,
                    words: 2,
                },
            ]
        );

        // extension went to the head of the extension section, which moved
        // forward by the capability inserted after it
        let fresh = SectionOffsets::locate(words).unwrap();
        assert_eq!(fresh.capabilities, stale.capabilities);
        assert_eq!(fresh.extensions, stale.extensions + 2);
        let (first_ext, _) = decode_literal_string(&words[fresh.extensions + 1..]).unwrap();
        assert_eq!(first_ext, PHYSICAL_STORAGE_BUFFER_EXTENSION);
        assert_eq!(words[fresh.capabilities + 1], PSB_CAP);

        assert_eq!(capabilities(words), vec![PSB_CAP, 1, 11]);
        assert_eq!(
            extensions(words),
            vec![
                PHYSICAL_STORAGE_BUFFER_EXTENSION.to_string(),
                "SPV_KHR_storage_buffer_storage_class".to_string()
            ]
        );

        // function and line data survive the shift
        let patched = ParsedModule::parse(words.clone()).unwrap();
        assert_eq!(patched.functions[0].name, "main");
        assert_eq!(patched.sources[0].markers, module.sources[0].markers);
        assert_eq!(patched.functions[0].variables, module.functions[0].variables);
    }

    #[test]
    fn test_repatch_with_dedup_is_idempotent() {
        let module = scenario_module();
        let patcher = Patcher::new(config_for(0, 20));
        let first = patcher.patch(&module).unwrap();
        assert_eq!(first.inserted.len(), 2);

        let reparsed = ParsedModule::parse(first.words.clone()).unwrap();
        let second = patcher.patch(&reparsed).unwrap();
        assert_eq!(second.previous_addressing, AddressingModel::PhysicalStorageBuffer64);
        assert!(second.inserted.is_empty());
        assert_eq!(second.words, first.words);
    }

    #[test]
    fn test_repatch_without_dedup_appends_declarations() {
        let module = scenario_module();
        let config = PatchConfig {
            dedup_declarations: false,
            ..config_for(0, 20)
        };
        let patcher = Patcher::new(config);
        let first = patcher.patch(&module).unwrap();
        let reparsed = ParsedModule::parse(first.words.clone()).unwrap();
        let second = patcher.patch(&reparsed).unwrap();

        let patched = ParsedModule::parse(second.words.clone()).unwrap();
        assert_eq!(patched.addressing_model(), AddressingModel::PhysicalStorageBuffer64);
        assert_eq!(second.inserted.len(), 2);
        assert_eq!(find_ops(&second.words, Op::Extension).len(), 2);
        assert_eq!(capabilities(&second.words), vec![PSB_CAP, PSB_CAP]);
        assert!(preamble_well_ordered(&second.words));
    }

    #[test]
    fn test_already_physical_module_keeps_addressing() {
        let mut builder =
            ModuleBuilder::new().addressing(AddressingModel::PhysicalStorageBuffer64);
        let file = builder.source_file("psb.comp");
        builder.function("main", &[], &[(file, 20)]);
        let module = ParsedModule::parse(builder.build()).unwrap();

        let outcome = Patcher::new(config_for(0, 20)).patch(&module).unwrap();
        assert_eq!(outcome.previous_addressing, AddressingModel::PhysicalStorageBuffer64);
        let ops: Vec<Op> = outcome.inserted.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Op::Extension, Op::Capability]);
    }

    #[test]
    fn test_unsupported_addressing_model() {
        for model in [
            AddressingModel::Physical32,
            AddressingModel::Physical64,
            AddressingModel::Unknown(77),
        ] {
            let mut builder = ModuleBuilder::new().addressing(model);
            let file = builder.source_file("kernel.cl");
            builder.function("k", &[], &[(file, 20)]);
            let module = ParsedModule::parse(builder.build()).unwrap();

            let result = Patcher::new(config_for(0, 20)).patch(&module);
            match result {
                Err(PatchError::UnsupportedAddressingModel(m)) => assert_eq!(m, model),
                other => panic!("expected UnsupportedAddressingModel, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_enable_physical_addressing_in_place() {
        let mut words = ModuleBuilder::new().build();
        let slot = SectionOffsets::locate(&words).unwrap().addressing_model_word();
        assert_eq!(
            enable_physical_addressing(&mut words).unwrap(),
            AddressingModel::Logical
        );
        assert_eq!(words[slot], 5348);
        assert_eq!(
            enable_physical_addressing(&mut words).unwrap(),
            AddressingModel::PhysicalStorageBuffer64
        );
        assert_eq!(words[slot], 5348);
    }

    #[test]
    fn test_missing_line_aborts_patch() {
        let module = scenario_module();
        let result = Patcher::new(config_for(0, 21)).patch(&module);
        assert!(matches!(result, Err(PatchError::LineNotFound(0, 21))));
    }

    #[test]
    fn test_unknown_file_aborts_patch() {
        let module = scenario_module();
        let result = Patcher::new(config_for(1, 20)).patch(&module);
        assert!(matches!(result, Err(PatchError::UnknownSourceFile(1, 1))));
    }

    #[test]
    fn test_inexact_policy_flows_through_config() {
        let module = scenario_module();

        let lenient = Patcher::new(config_for(0, 15)).patch(&module).unwrap();
        assert_eq!(lenient.location.matched, LineMatch::Inexact { found: 20 });
        assert_eq!(lenient.location.function_name, "F");

        let strict = PatchConfig {
            inexact_lines: InexactLinePolicy::Reject,
            ..config_for(0, 15)
        };
        let result = Patcher::new(strict).patch(&module);
        assert!(matches!(result, Err(PatchError::InexactLine(15, 20))));
    }
}
