use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use strix_core::{
    ComponentDef, Engine, FunctionComponent, MountOptions, Mounted, Setup, TemplateSet, Value,
};
use strix_dom::memory::MemorySurface;
use strix_template::{Ast, Attr};

#[derive(Parser)]
#[command(name = "strix", version, about = "Strix rendering engine demos")]
struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a built-in demo against an in-memory surface and print the HTML.
    Render {
        /// Demo name (see `strix list`)
        name: String,
        /// Update the render context and re-render, printing the patched HTML.
        #[arg(long)]
        rerender: bool,
    },
    /// List the built-in demos.
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match cli.command {
        Commands::Render { name, rerender } => render_cmd(&name, rerender),
        Commands::List => {
            for demo in DEMOS {
                println!("{:<10} {}", demo.name, demo.about);
            }
            Ok(())
        }
    }
}

struct Demo {
    name: &'static str,
    about: &'static str,
    register: fn(&TemplateSet) -> ComponentDef,
    /// Context mutation applied before `--rerender`.
    update: Option<fn(&Mounted)>,
}

static DEMOS: &[Demo] = &[
    Demo {
        name: "greeting",
        about: "template variables with a rendered fallback body",
        register: greeting,
        update: None,
    },
    Demo {
        name: "counter",
        about: "escaped output patched in place on re-render",
        register: counter,
        update: Some(bump_counter),
    },
    Demo {
        name: "todo",
        about: "list rendering; re-render appends an item",
        register: todo,
        update: Some(push_todo),
    },
    Demo {
        name: "nested",
        about: "a child component with deferred setup",
        register: nested,
        update: None,
    },
];

fn render_cmd(name: &str, rerender: bool) -> Result<()> {
    let demo = DEMOS
        .iter()
        .find(|demo| demo.name == name)
        .ok_or_else(|| anyhow!("unknown demo `{name}`, try `strix list`"))?;

    let templates = Rc::new(TemplateSet::new());
    let surface = Rc::new(RefCell::new(MemorySurface::new()));
    let target = surface.borrow_mut().create_root();
    let engine = Engine::new(templates.clone(), surface.clone());

    let def = (demo.register)(&templates);
    let done = engine.mount(target, &def, MountOptions::default());
    engine.flush();
    let mounted = done
        .result()
        .ok_or_else(|| anyhow!("mount never settled"))??;
    println!("{}", surface.borrow().inner_html(target));

    if rerender {
        let Some(update) = demo.update else {
            bail!("demo `{name}` has no re-render step");
        };
        update(&mounted);
        let redone = engine.rerender(&mounted);
        engine.flush();
        redone
            .result()
            .ok_or_else(|| anyhow!("re-render never settled"))??;
        println!("{}", surface.borrow().inner_html(target));
    }
    Ok(())
}

fn greeting(templates: &TemplateSet) -> ComponentDef {
    templates.add(
        "greeting",
        vec![Ast::dom(
            "div",
            vec![Attr::lit("class", "greeting"), Attr::expr("class", "tone")],
            vec![
                Ast::Set {
                    name: "who".to_string(),
                    value: Some("props.name".to_string()),
                    body: vec![Ast::text("world")],
                },
                Ast::text("Hello "),
                Ast::esc("who"),
            ],
        )],
    );
    ComponentDef::function(
        FunctionComponent::new("Greeting", "greeting").with_setup(|_props, _env| {
            Ok(Setup::Ready(Value::map([(
                "tone".to_string(),
                Value::str("warm"),
            )])))
        }),
    )
}

fn counter(templates: &TemplateSet) -> ComponentDef {
    templates.add(
        "counter",
        vec![Ast::dom(
            "div",
            vec![],
            vec![Ast::text("count: "), Ast::esc("count")],
        )],
    );
    ComponentDef::function(
        FunctionComponent::new("Counter", "counter").with_setup(|_props, _env| {
            Ok(Setup::Ready(Value::map([(
                "count".to_string(),
                Value::Int(0),
            )])))
        }),
    )
}

fn bump_counter(mounted: &Mounted) {
    if let Value::Int(n) = mounted.scope().get("count") {
        mounted.scope().set("count", Value::Int(n + 1));
    }
}

fn todo(templates: &TemplateSet) -> ComponentDef {
    templates.add(
        "todo",
        vec![Ast::dom(
            "ul",
            vec![],
            vec![Ast::Repeat {
                list: "items".to_string(),
                var: "item".to_string(),
                body: vec![Ast::dom("li", vec![], vec![Ast::esc("item")])],
            }],
        )],
    );
    ComponentDef::function(FunctionComponent::new("Todo", "todo").with_setup(|_props, _env| {
        Ok(Setup::Ready(Value::map([(
            "items".to_string(),
            Value::List(vec![Value::str("buy milk"), Value::str("write code")]),
        )])))
    }))
}

fn push_todo(mounted: &Mounted) {
    if let Value::List(mut items) = mounted.scope().get("items") {
        items.push(Value::str("ship it"));
        mounted.scope().set("items", Value::List(items));
    }
}

fn nested(templates: &TemplateSet) -> ComponentDef {
    templates.add(
        "badge",
        vec![Ast::dom("em", vec![], vec![Ast::esc("label")])],
    );
    templates.add(
        "nested",
        vec![Ast::dom(
            "span",
            vec![],
            vec![Ast::text("status: "), Ast::component("Badge")],
        )],
    );
    let badge = ComponentDef::function(FunctionComponent::new("Badge", "badge").with_setup(
        |_props, _env| {
            // resolved on a later scheduler turn; the parent commits only
            // after this settles
            Ok(Setup::Deferred(Box::new(|| {
                Ok(Value::map([("label".to_string(), Value::str("ready"))]))
            })))
        },
    ));
    ComponentDef::function(FunctionComponent::new("Nested", "nested").with_component("Badge", badge))
}
