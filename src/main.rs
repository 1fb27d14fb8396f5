use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vertebra::{attrs, dom::Element, Collection, Model, Observable, Value, View};

#[derive(Parser, Debug)]
#[command(name = "vertebra")]
#[command(about = "Replays the model, collection and view scenarios")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds three people to a collection and prints their attribute pairs.
    Collection,
    /// Renders a model whose `name` overrides the default `Ben`.
    Render {
        /// JSON value for `name`; anything that is not JSON is taken as a string.
        #[arg(long, default_value = "Jack")]
        name: String,
    },
    /// Binds a click handler to one button, rebinds it to another, and clicks both.
    SetElement {
        /// Leave the view bound to the first button.
        #[arg(long)]
        no_rebind: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Collection => {
            collection();
            Ok(())
        }
        Command::Render { name } => render(&name),
        Command::SetElement { no_rebind } => set_element(!no_rebind),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn collection() {
    let people = Collection::new();
    people.on("add", |e| {
        if let Some(model) = e.model() {
            tracing::info!(cid = %model.cid(), "added");
        }
    });

    let tom = Model::new(attrs! { "name" => "Tom", "gid" => 5, "can" => "do" });
    let rob = Model::new(attrs! { "name" => "Rob", "gid" => 10, "can" => "dont" });
    let tim = Model::new(attrs! { "name" => "Tim", "gid" => 10, "can" => "do" });

    people.add(&tom);
    people.add(&rob);
    people.add(&tim);

    println!("{:?}", tom.to_pairs());
    println!("size: {}", people.len());
    for (model, key, value) in people.pairs() {
        println!("{} {key} = {value}", model.cid());
    }
}

fn render(name: &str) -> vertebra::Result<()> {
    let name = serde_json::from_str::<serde_json::Value>(name)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(name));
    let model = Model::builder()
        .default_value("name", "Ben")
        .attribute("name", name)
        .build()?;
    let view = View::builder()
        .element(Element::new("div").with_class("example-content"))
        .model(model.clone())
        .template(|json| {
            let name = json["name"].as_str().unwrap_or_default();
            format!("<h1>Hello {name}</h1>")
        })
        .build()?;
    view.listen_to(&model, "change", |view, _| {
        view.render();
    });
    view.render();
    println!("{}", view.el().html());
    Ok(())
}

fn set_element(rebind: bool) -> vertebra::Result<()> {
    let button1 = Element::new("button");
    let button2 = Element::new("button").with_class("dog");

    let view = View::builder()
        .element(button1.clone())
        .event_fn("click", |view, e| println!("{}", &view.el() == e.target()))
        .build()?;
    if rebind {
        view.set_element(button2.clone());
    }

    button1.trigger("click");
    button2.trigger("click");
    Ok(())
}
