//! `promptforge assemble` — Print the layered instruction text.

use promptforge_engine::fragments::clamp_verbosity;
use promptforge_engine::{AssemblyRequest, FragmentConfig};

use super::{CliResult, build_assembler, load_config};

pub struct AssembleArgs {
    pub scenario: Option<String>,
    pub persona: Option<String>,
    pub template: Option<String>,
    pub verbosity: Option<u8>,
    pub custom: Option<String>,
    pub skeleton: bool,
    pub list: bool,
}

pub fn run(args: AssembleArgs) -> CliResult {
    let config = load_config()?;
    let assembler = build_assembler(&config)?;

    if args.list {
        println!("Scenarios:  {}", assembler.available_scenarios().join(", "));
        println!("Personas:   {}", assembler.available_personas().join(", "));
        println!("Templates:  {}", assembler.available_templates().join(", "));
        println!("Skills:     {}", assembler.available_skills().join(", "));
        return Ok(());
    }

    let mut request = AssemblyRequest::from_config(&config.assembly);
    if let Some(scenario) = args.scenario {
        request.scenario = scenario;
    }
    if args.persona.is_some() {
        request.persona = args.persona;
    }
    if let Some(template) = args.template {
        request.template = template;
    }
    if let Some(level) = args.verbosity {
        request.verbosity = clamp_verbosity(level);
    }
    request.custom_instructions = args.custom;

    if args.skeleton {
        println!(
            "{}",
            assembler.skeleton_preview(&request.scenario, request.persona.as_deref(), &request.template)
        );
        return Ok(());
    }

    let assembled = assembler.assemble(&request, &FragmentConfig::new());
    println!("{}", assembled.text);

    eprintln!();
    for layer in &assembled.layers {
        eprintln!("  {:<14} ~{} tokens", layer.name, layer.tokens);
    }
    eprintln!("  {:<14} ~{} tokens", "total", assembled.total_tokens());
    Ok(())
}
