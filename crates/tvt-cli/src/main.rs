use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tvt_core::actions::UserAction;
use tvt_core::config::Config;
use tvt_core::prompt::build_base_prompt;
use tvt_core::prompt::optimized_prompt;
use tvt_core::state::AnalysisField;
use tvt_core::state::AnalysisMode;
use tvt_core::state::FewShotInputField;
use tvt_core::state::FormModule;
use tvt_core::state::MainFormState;
use tvt_core::state::ModalityType;
use tvt_core::state::OptimizationStrategy;
use tvt_core::state::PromptType;
use tvt_core::state::QaField;
use tvt_core::state::QaMode;
use tvt_core::state::RequestPhase;
use tvt_core::templates::TemplateDraft;
use tvt_core::templates::TemplateField;
use tvt_exec::executor::HttpRequestExecutor;
use tvt_exec::executor::RequestExecutor;
use tvt_exec::executor::SimulatedRequestExecutor;
use tvt_exec::runtime::ConsoleRuntime;

mod config;
mod files;
mod session;
mod ui;

#[derive(Parser, Debug)]
#[command(name = "tvt", version)]
#[command(about = "Tactile, vision and text analysis console", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/tvt/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the analysis API (overrides TVT_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Answer every request locally instead of calling the API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Unified analysis of the main form inputs
    Analyze(AnalyzeArgs),

    /// Tactile data plus task instruction
    TactileText {
        #[arg(long)]
        tactile_data: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[command(flatten)]
        custom: CustomPromptArgs,
    },

    /// Image plus text description
    VisionText {
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        #[command(flatten)]
        custom: CustomPromptArgs,
    },

    /// Tactile data, image and text description together
    Complete {
        #[arg(long)]
        tactile_data: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        #[command(flatten)]
        custom: CustomPromptArgs,
    },

    /// Predict an output for a new input from worked examples
    FewShot {
        /// YAML list of {tactile, text, output} examples
        #[arg(long)]
        examples: Option<PathBuf>,
        /// Use the built-in demo examples
        #[arg(long, conflicts_with = "examples")]
        demo: bool,
        #[arg(long)]
        tactile_data: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Ask a question about one or more modalities
    Ask {
        #[command(subcommand)]
        mode: AskCommand,
    },

    /// List the sample questions offered by the API
    Samples,

    /// Inspect and create analysis templates
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },

    /// Preview the base and optimized prompt without sending anything
    Prompt(PromptArgs),

    /// Interactive session on the main form
    Session,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    inputs: MainInputArgs,

    /// Run an optimization pass before sending
    #[arg(long)]
    optimize: bool,

    /// Send this prompt instead of the generated one
    #[arg(long)]
    prompt: Option<String>,
}

#[derive(Args, Debug)]
struct PromptArgs {
    #[command(flatten)]
    inputs: MainInputArgs,
}

#[derive(Args, Debug)]
struct MainInputArgs {
    #[arg(long)]
    tactile: Option<PathBuf>,
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    text: Option<String>,
    /// tactile-text, vision-text, combined or text-only
    #[arg(long, value_parser = parse_prompt_type, default_value = "combined")]
    mode: PromptType,
    /// balanced, clarity, structure or specificity
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<OptimizationStrategy>,
    /// Start the prompt with the contextual header
    #[arg(long)]
    context: bool,
}

#[derive(Args, Debug)]
struct CustomPromptArgs {
    /// Replace the server's default prompt
    #[arg(long)]
    custom_prompt: Option<String>,
}

#[derive(Subcommand, Debug)]
enum AskCommand {
    /// Question about one modality
    Single {
        #[arg(long)]
        question: Option<String>,
        /// tactile, vision or text
        #[arg(long, value_parser = parse_modality, default_value = "tactile")]
        modality: ModalityType,
        #[arg(long)]
        data: Option<String>,
    },
    /// Question about up to two modalities
    Dual(QaDataArgs),
    /// Question about tactile, image and text data together
    Multi(QaDataArgs),
}

#[derive(Args, Debug)]
struct QaDataArgs {
    #[arg(long)]
    question: Option<String>,
    #[arg(long)]
    tactile_data: Option<String>,
    #[arg(long)]
    text_data: Option<String>,
    #[arg(long)]
    image: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    /// List available templates
    List,
    /// Show model information
    ModelInfo,
    /// Create a custom template
    Create {
        /// YAML draft with name, template and required_inputs
        #[arg(long, conflicts_with_all = ["name", "template", "required_inputs", "example"])]
        from: Option<PathBuf>,
        /// Start from the example draft
        #[arg(long)]
        example: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        template: Option<String>,
        /// JSON array of placeholder names, e.g. '["surface"]'
        #[arg(long)]
        required_inputs: Option<String>,
    },
    /// Print the example draft as YAML
    Example,
}

fn parse_prompt_type(value: &str) -> Result<PromptType, String> {
    PromptType::parse(value).ok_or_else(|| {
        let known: Vec<&str> = PromptType::ALL.iter().map(|mode| mode.slug()).collect();
        format!("expected one of {}", known.join(", "))
    })
}

fn parse_strategy(value: &str) -> Result<OptimizationStrategy, String> {
    OptimizationStrategy::parse(value).ok_or_else(|| {
        let known: Vec<&str> = OptimizationStrategy::ALL
            .iter()
            .map(|strategy| strategy.slug())
            .collect();
        format!("expected one of {}", known.join(", "))
    })
}

fn parse_modality(value: &str) -> Result<ModalityType, String> {
    [ModalityType::Tactile, ModalityType::Vision, ModalityType::Text]
        .into_iter()
        .find(|modality| modality.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| "expected one of tactile, vision, text".to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;
    config::apply_api_url(
        &mut config,
        env::var(config::API_URL_ENV).ok(),
        cli.api_url.clone(),
    );

    let executor: Arc<dyn RequestExecutor> = if cli.offline {
        Arc::new(SimulatedRequestExecutor)
    } else {
        Arc::new(HttpRequestExecutor::new(&config.api)?)
    };
    log::debug!(
        "using {} executor against {}",
        executor.name(),
        config.api.base_url
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(execute(cli.command, config, executor))
}

async fn execute(
    command: Commands,
    config: Config,
    executor: Arc<dyn RequestExecutor>,
) -> Result<()> {
    match command {
        Commands::Session => {
            let mut runtime = ConsoleRuntime::new(&config, executor);
            session::run_session(&mut runtime).await
        }
        Commands::Prompt(args) => preview_prompt(&config, &args),
        Commands::Analyze(args) => analyze(&mut one_shot(config, executor), args).await,
        Commands::TactileText {
            tactile_data,
            task,
            custom,
        } => {
            let runtime = &mut one_shot(config, executor);
            runtime.dispatch(UserAction::SetAnalysisMode(AnalysisMode::TactileText));
            set_analysis(runtime, AnalysisField::TactileData, tactile_data);
            set_analysis(runtime, AnalysisField::TaskInstruction, task);
            set_custom_prompt(runtime, custom);
            submit_and_print(runtime, FormModule::Analysis, UserAction::SubmitAnalysis).await
        }
        Commands::VisionText {
            description,
            task,
            image,
            custom,
        } => {
            let runtime = &mut one_shot(config, executor);
            runtime.dispatch(UserAction::SetAnalysisMode(AnalysisMode::VisionText));
            set_analysis(runtime, AnalysisField::TextDescription, description);
            set_analysis(runtime, AnalysisField::TaskInstruction, task);
            runtime.dispatch(UserAction::SetAnalysisImage(files::load_optional(
                image.as_deref(),
            )?));
            set_custom_prompt(runtime, custom);
            submit_and_print(runtime, FormModule::Analysis, UserAction::SubmitAnalysis).await
        }
        Commands::Complete {
            tactile_data,
            description,
            task,
            image,
            custom,
        } => {
            let runtime = &mut one_shot(config, executor);
            runtime.dispatch(UserAction::SetAnalysisMode(AnalysisMode::Complete));
            set_analysis(runtime, AnalysisField::TactileData, tactile_data);
            set_analysis(runtime, AnalysisField::TextDescription, description);
            set_analysis(runtime, AnalysisField::TaskInstruction, task);
            runtime.dispatch(UserAction::SetAnalysisImage(files::load_optional(
                image.as_deref(),
            )?));
            set_custom_prompt(runtime, custom);
            submit_and_print(runtime, FormModule::Analysis, UserAction::SubmitAnalysis).await
        }
        Commands::FewShot {
            examples,
            demo,
            tactile_data,
            description,
            image,
        } => {
            let runtime = &mut one_shot(config, executor);
            if demo {
                runtime.dispatch(UserAction::LoadDemoExamples);
            } else if let Some(path) = examples.as_deref() {
                runtime.dispatch(UserAction::ReplaceExamples(files::load_examples(path)?));
            }
            log::debug!(
                "few-shot examples:\n{}",
                ui::render_examples(&runtime.state().few_shot.examples)
            );
            for (field, value) in [
                (FewShotInputField::TactileData, tactile_data),
                (FewShotInputField::TextDescription, description),
            ] {
                if let Some(value) = value {
                    runtime.dispatch(UserAction::SetFewShotInput { field, value });
                }
            }
            runtime.dispatch(UserAction::SetFewShotImage(files::load_optional(
                image.as_deref(),
            )?));
            submit_and_print(runtime, FormModule::FewShot, UserAction::SubmitFewShot).await
        }
        Commands::Ask { mode } => ask(&mut one_shot(config, executor), mode).await,
        Commands::Samples => {
            let runtime = &mut one_shot(config, executor);
            submit(runtime, FormModule::Qa, UserAction::LoadSampleQuestions).await?;
            if let Some(questions) = runtime.state().qa.sample_questions.as_ref() {
                print!("{}", ui::render_sample_questions(questions));
            }
            Ok(())
        }
        Commands::Templates { command } => templates(&mut one_shot(config, executor), command).await,
    }
}

/// Runtime for a single command. Optimization only runs when asked for.
fn one_shot(mut config: Config, executor: Arc<dyn RequestExecutor>) -> ConsoleRuntime {
    config.optimizer.auto_optimize = false;
    ConsoleRuntime::new(&config, executor)
}

async fn analyze(runtime: &mut ConsoleRuntime, args: AnalyzeArgs) -> Result<()> {
    let AnalyzeArgs {
        inputs,
        optimize,
        prompt,
    } = args;
    runtime.dispatch(UserAction::SetPromptType(inputs.mode));
    runtime.dispatch(UserAction::SetAddContextualInfo(inputs.context));
    if let Some(strategy) = inputs.strategy {
        runtime.dispatch(UserAction::SetOptimizationStrategy(strategy));
    }
    if let Some(file) = files::load_optional(inputs.tactile.as_deref())? {
        runtime.dispatch(UserAction::SetTactileFile(Some(file)));
    }
    if let Some(file) = files::load_optional(inputs.image.as_deref())? {
        runtime.dispatch(UserAction::SetVisualFile(Some(file)));
    }
    if let Some(text) = inputs.text {
        runtime.dispatch(UserAction::SetTextualInput(text));
    }
    if optimize {
        runtime.dispatch(UserAction::OptimizePrompt);
        runtime.run_until_idle().await;
    }
    if let Some(prompt) = prompt {
        runtime.dispatch(UserAction::EditPromptText(prompt));
    }
    submit_and_print(runtime, FormModule::Main, UserAction::SubmitMain).await
}

async fn ask(runtime: &mut ConsoleRuntime, mode: AskCommand) -> Result<()> {
    let (qa_mode, question, fields, image) = match mode {
        AskCommand::Single {
            question,
            modality,
            data,
        } => {
            runtime.dispatch(UserAction::SetModalityType(modality));
            (QaMode::Single, question, vec![(QaField::ModalityData, data)], None)
        }
        AskCommand::Dual(args) => (
            QaMode::Dual,
            args.question,
            vec![
                (QaField::TactileData, args.tactile_data),
                (QaField::TextData, args.text_data),
            ],
            args.image,
        ),
        AskCommand::Multi(args) => (
            QaMode::Multi,
            args.question,
            vec![
                (QaField::TactileData, args.tactile_data),
                (QaField::TextData, args.text_data),
            ],
            args.image,
        ),
    };

    runtime.dispatch(UserAction::SetQaMode(qa_mode));
    let fields = std::iter::once((QaField::Question, question)).chain(fields);
    for (field, value) in fields {
        if let Some(value) = value {
            runtime.dispatch(UserAction::SetQaField { field, value });
        }
    }
    runtime.dispatch(UserAction::SetQaImage(files::load_optional(
        image.as_deref(),
    )?));
    submit_and_print(runtime, FormModule::Qa, UserAction::SubmitQa).await
}

async fn templates(runtime: &mut ConsoleRuntime, command: TemplatesCommand) -> Result<()> {
    match command {
        TemplatesCommand::List => {
            submit(runtime, FormModule::Templates, UserAction::LoadTemplates).await?;
        }
        TemplatesCommand::ModelInfo => {
            submit(runtime, FormModule::Templates, UserAction::LoadModelInfo).await?;
        }
        TemplatesCommand::Create {
            from,
            example,
            name,
            template,
            required_inputs,
        } => {
            if let Some(path) = from.as_deref() {
                let draft = files::load_template_draft(path)?;
                runtime.dispatch(UserAction::ReplaceTemplateDraft(draft));
            } else if example {
                runtime.dispatch(UserAction::LoadExampleTemplate);
            }
            for (field, value) in [
                (TemplateField::Name, name),
                (TemplateField::Template, template),
                (TemplateField::RequiredInputs, required_inputs),
            ] {
                if let Some(value) = value {
                    runtime.dispatch(UserAction::SetTemplateField { field, value });
                }
            }
            submit(runtime, FormModule::Templates, UserAction::CreateTemplate).await?;
        }
        TemplatesCommand::Example => {
            print!("{}", serde_yaml::to_string(&TemplateDraft::example())?);
            return Ok(());
        }
    }
    print!("{}", ui::render_templates(&runtime.state().templates));
    Ok(())
}

fn preview_prompt(config: &Config, args: &PromptArgs) -> Result<()> {
    let inputs = &args.inputs;
    let form = MainFormState {
        tactile_file: files::load_optional(inputs.tactile.as_deref())?,
        visual_file: files::load_optional(inputs.image.as_deref())?,
        textual_input: inputs.text.clone().unwrap_or_default(),
        prompt_type: inputs.mode,
        add_contextual_info: inputs.context,
        ..MainFormState::default()
    };
    let strategy = inputs.strategy.unwrap_or(config.optimizer.strategy);
    let base = build_base_prompt(&form);

    println!("Base prompt:\n{base}\n");
    println!(
        "Optimized prompt ({}, {}):\n{}",
        strategy.label(),
        config.optimizer.version,
        optimized_prompt(&base, form.prompt_type, strategy)
    );
    Ok(())
}

fn set_analysis(runtime: &mut ConsoleRuntime, field: AnalysisField, value: Option<String>) {
    if let Some(value) = value {
        runtime.dispatch(UserAction::SetAnalysisField { field, value });
    }
}

fn set_custom_prompt(runtime: &mut ConsoleRuntime, custom: CustomPromptArgs) {
    if let Some(prompt) = custom.custom_prompt {
        runtime.dispatch(UserAction::SetUseCustomPrompt(true));
        set_analysis(runtime, AnalysisField::CustomPrompt, Some(prompt));
    }
}

/// Dispatches a submit action, waits for everything it started and reports
/// the notices it produced on stderr.
async fn submit(runtime: &mut ConsoleRuntime, module: FormModule, action: UserAction) -> Result<()> {
    let seen = ui::last_notice_seq(runtime.state());
    runtime.dispatch(action);
    let sent = runtime.state().is_loading(module);
    runtime.run_until_idle().await;

    for notice in ui::render_notices_since(runtime.state(), seen) {
        eprintln!("{notice}");
    }
    if !sent {
        bail!("{} request was not sent", module.label());
    }
    let slot = runtime.state().requests.slot(module);
    log::debug!("{} request {}", module.label(), slot.phase.label());
    if slot.phase == RequestPhase::Failed {
        let message = slot
            .last_error
            .as_ref()
            .map(|error| format!("{} ({})", error.message, error.kind.label()))
            .unwrap_or_else(|| ui::UNKNOWN_FAILURE.to_string());
        bail!("{} request failed: {message}", module.label());
    }
    Ok(())
}

async fn submit_and_print(
    runtime: &mut ConsoleRuntime,
    module: FormModule,
    action: UserAction,
) -> Result<()> {
    submit(runtime, module, action).await?;
    if let Some(result) = ui::render_module_result(runtime.state(), module) {
        println!("{result}");
    }
    Ok(())
}
