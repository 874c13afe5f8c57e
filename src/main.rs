// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;

use tutor_rs::adk::retriever::Retriever;
use tutor_rs::tutor::config::Settings;
use tutor_rs::tutor::evaluation::load_dataset;
use tutor_rs::tutor::skills::gather_context;
use tutor_rs::tutor::{AppContext, Request};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// The model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Document (file or URL) to load for retrieval; repeatable
    #[arg(short, long = "document", global = true)]
    documents: Vec<String>,

    /// Where remembered facts are stored
    #[arg(long, global = true)]
    facts: Option<PathBuf>,

    /// Directory for session checkpoints
    #[arg(long, global = true)]
    checkpoints: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the tutor (explain, quiz, flashcards or study plan, by question)
    Ask {
        /// The question to route
        question: String,
    },
    /// Chat with the assistant that remembers you
    Chat {
        /// The message to send
        message: String,

        /// Session to resume
        #[arg(short, long, default_value = "default")]
        session: String,
    },
    /// Generate a multiple-choice quiz
    Quiz {
        /// Topic of the quiz
        topic: String,
    },
    /// Generate flashcards
    Flashcards {
        /// Topic of the cards
        topic: String,
    },
    /// Generate a study plan
    Plan {
        /// What to study
        topic: String,

        /// Time available
        #[arg(long, default_value = "1 week, 1 hour per day")]
        duration: String,
    },
    /// Score the tutor's answers against a dataset
    Evaluate {
        /// Dataset of question / ground_truth pairs (YAML or JSON)
        dataset: PathBuf,
    },
    /// List remembered facts
    Facts,
    /// Run the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

impl Args {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(facts) = &self.facts {
            settings.facts_path = facts.clone();
        }
        if let Some(dir) = &self.checkpoints {
            settings.checkpoint_dir = dir.clone();
        }
        settings.documents.extend(self.documents.iter().cloned());
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let app = AppContext::build(args.settings()?)
        .await
        .context("failed to initialise")?;

    match args.command {
        Commands::Ask { question } => {
            let output = app.tutoring()?.run(Request::new(question), None).await?;
            println!("Intent: {}", serde_json::to_string(&output.intent)?);
            println!("Steps: {}", output.steps.join(" -> "));
            println!("\n{}", output.answer);
        }
        Commands::Chat { message, session } => {
            let output = app
                .memory()?
                .run(Request::new(message), Some(&session))
                .await?;
            println!("Steps: {}", output.steps.join(" -> "));
            println!("\n{}", output.answer);
        }
        Commands::Quiz { topic } => {
            let context = context_for(&app, &topic).await?;
            let quiz = app.generator()?.quiz(&topic, &context).await?;
            println!("{}", quiz);
        }
        Commands::Flashcards { topic } => {
            let context = context_for(&app, &topic).await?;
            let cards = app.generator()?.flashcards(&topic, &context).await?;
            println!("{}", cards);
        }
        Commands::Plan { topic, duration } => {
            let context = context_for(&app, &topic).await?;
            let plan = app
                .generator()?
                .study_plan(&topic, &duration, &context)
                .await?;
            println!("{}", plan);
        }
        Commands::Evaluate { dataset } => {
            let cases = load_dataset(&dataset)
                .await
                .with_context(|| format!("failed to load {}", dataset.display()))?;
            println!("Loaded {} test cases.\n", cases.len());

            let report = app.evaluator()?.evaluate(&cases, &app.tutoring()?).await?;
            for (i, result) in report.results.iter().enumerate() {
                println!("--- Test Case {}: {} ---", i + 1, result.question);
                println!("Score: {}/5", result.score);
                println!("Reasoning: {}\n", result.reasoning);
            }
            match report.average_score() {
                Some(avg) => println!("Average Score = {:.2}/5", avg),
                None => println!("No test cases to score"),
            }
        }
        Commands::Facts => {
            let facts = app.facts.facts().await;
            if facts.is_empty() {
                println!("No facts remembered yet.");
            }
            for fact in facts {
                println!("- {}", fact);
            }
        }
        Commands::Serve { port } => {
            tutor_rs::server::serve(&app, port).await?;
        }
    }

    Ok(())
}

async fn context_for(app: &AppContext, topic: &str) -> anyhow::Result<String> {
    let retriever: Option<&dyn Retriever> = app.retriever.as_deref();
    Ok(gather_context(retriever, topic).await?)
}
