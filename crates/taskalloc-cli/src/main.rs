use clap::{Parser, Subcommand};
use taskalloc_solver::{validate, SolveOutcome, Solver};

#[derive(Parser)]
#[command(name = "taskalloc")]
#[command(about = "Minimize total weighted execution time under resource limits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and solve an allocation problem
    Solve {
        /// Unit execution cost per task (minutes per unit), comma-separated
        #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        costs: Vec<f64>,
        /// Availability limit per resource, bound to tasks by position
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        limits: Vec<f64>,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Validate a problem without solving it
    Check {
        /// Unit execution cost per task (minutes per unit), comma-separated
        #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        costs: Vec<f64>,
        /// Availability limit per resource, bound to tasks by position
        #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
        limits: Vec<f64>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            costs,
            limits,
            format,
        } => {
            let program = match validate(&costs, &limits) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let solver = Solver::new();
            let outcome = solver.solve(&program);

            if format == "json" {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome)
                        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
                );
                if !outcome.is_solved() {
                    std::process::exit(1);
                }
                return;
            }

            match outcome {
                SolveOutcome::Solved(solution) => {
                    println!("Status: OPTIMAL");
                    println!("Allocations:");
                    for (i, amount) in solution.allocation.iter().enumerate() {
                        println!("  Task {:<3} {:10.4}", i + 1, amount);
                    }
                    println!(
                        "Total execution time: {:.4} minutes",
                        solution.objective_value
                    );
                }
                SolveOutcome::Infeasible => {
                    println!("Status: INFEASIBLE");
                    println!("No allocation satisfies all constraints.");
                    std::process::exit(1);
                }
                SolveOutcome::Unbounded => {
                    println!("Status: UNBOUNDED");
                    println!("The problem has no finite optimal allocation.");
                    std::process::exit(1);
                }
                SolveOutcome::Invalid(e) => {
                    println!("Status: INVALID");
                    println!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { costs, limits } => match validate(&costs, &limits) {
            Ok(program) => {
                println!(
                    "✓ valid problem: {} tasks, {} resource limits",
                    program.num_tasks(),
                    program.num_limits()
                );
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                std::process::exit(1);
            }
        },
    }
}
