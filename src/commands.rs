use crate::{
    Args, Command,
    config::Config,
    controller::AlertController,
    error::AlertError,
    http,
    page::{PageQuery, fragment_text},
    selection::{AlertId, StatusAction},
    service::{AlertService, wire::Targets},
    view::terminal::TerminalView,
    watcher::Watcher,
};
use std::time::Duration;

type Controller = AlertController<AlertService, TerminalView>;

/// Run the command selected on the command line
pub async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    let yes = args.yes;

    match args.command {
        Command::List { query } => list(&config, &query).await,
        Command::Bulk {
            action,
            ids,
            all,
            query,
        } => bulk(&config, yes, action, ids, all, &query).await,
        Command::Mark { id, action, query } => mark(&config, yes, id, action, &query).await,
        Command::Delete { id, query } => delete(&config, yes, id, &query).await,
        Command::Detail { id } => detail(&config, id).await,
        Command::Watch { interval, query } => watch(config, interval, query).await,
    }
}

async fn list(config: &Config, query: &PageQuery) -> anyhow::Result<()> {
    let service = AlertService::new(config.service.clone(), config.endpoints.clone())?;
    let page = service.fetch_page(query).await?;

    crate::metrics::record_page(page.alerts.len(), page.unread());
    TerminalView::new(false).print_page(&page);

    Ok(())
}

async fn bulk(
    config: &Config,
    yes: bool,
    action: StatusAction,
    ids: Vec<String>,
    all: bool,
    query: &PageQuery,
) -> anyhow::Result<()> {
    let controller = open(config, yes, query).await?;

    let result = if all {
        controller.submit_bulk(action, Targets::All).await
    } else {
        for id in ids.into_iter().map(AlertId::from) {
            if !controller.toggle_one(&id, true) {
                eprintln!("warning: alert {id} is not on the current page, skipping");
            }
        }

        controller.submit_selection(action).await
    };

    settle(result.map(|_| ()))?;
    refresh(&controller, query).await
}

async fn mark(
    config: &Config,
    yes: bool,
    id: String,
    action: StatusAction,
    query: &PageQuery,
) -> anyhow::Result<()> {
    let controller = open(config, yes, query).await?;

    settle(controller.mark_one(&AlertId::from(id), action).await)?;
    refresh(&controller, query).await
}

async fn delete(config: &Config, yes: bool, id: String, query: &PageQuery) -> anyhow::Result<()> {
    let controller = open(config, yes, query).await?;

    settle(controller.delete_one(&AlertId::from(id)).await)?;
    refresh(&controller, query).await
}

async fn detail(config: &Config, id: String) -> anyhow::Result<()> {
    let service = AlertService::new(config.service.clone(), config.endpoints.clone())?;
    let controller = AlertController::new(
        service,
        TerminalView::new(false),
        Vec::new(),
        config.controller.settings(),
    );

    let html = controller.detail(&AlertId::from(id)).await?;
    println!("{}", fragment_text(&html));

    Ok(())
}

async fn watch(config: Config, interval: u64, query: PageQuery) -> anyhow::Result<()> {
    let watcher = Watcher::new(&config, query, Duration::from_secs(interval))?;

    tokio::spawn(async move {
        if let Err(e) = watcher.start().await {
            tracing::error!("Watcher stopped: {}", e);
        }
    });

    http::create_server(config.http).await
}

/// Load the page and build a controller over what it renders
async fn open(config: &Config, yes: bool, query: &PageQuery) -> anyhow::Result<Controller> {
    let service = AlertService::new(config.service.clone(), config.endpoints.clone())?;
    let page = service.fetch_page(query).await?;

    Ok(AlertController::new(
        service,
        TerminalView::new(yes),
        page.alerts,
        config.controller.settings(),
    ))
}

/// Perform the refresh the last operation asked for
async fn refresh(controller: &Controller, query: &PageQuery) -> anyhow::Result<()> {
    let Some(delay) = controller.view().take_pending_refresh() else {
        return Ok(());
    };

    tokio::time::sleep(delay).await;

    let page = controller.api().fetch_page(query).await?;
    controller.reload(page.alerts.clone());
    controller.view().print_page(&page);

    Ok(())
}

/// The operator already saw the notification, declining is not a failure
fn settle(result: Result<(), AlertError>) -> anyhow::Result<()> {
    match result {
        Ok(()) | Err(AlertError::Declined) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
