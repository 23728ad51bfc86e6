use crate::{
    auth::AuthGateway,
    catalog::{ArticleComposer, ContentCatalog, SortOrder},
    comments::CommentThread,
    error::ClientError,
    guard::Route,
    models::{Article, Credentials, Registration},
    profile::ProfileManager,
    session::SessionStore,
    topics::TopicSubscriptionManager,
    view::{Delivery, Navigator},
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Context {
    pub session: Rc<SessionStore>,
    pub nav: Navigator,
    pub auth: AuthGateway,
    pub catalog: RefCell<ContentCatalog>,
    pub topics: RefCell<TopicSubscriptionManager>,
    pub comments: RefCell<CommentThread>,
    pub profile: RefCell<ProfileManager>,
    pub article: RefCell<Option<Article>>,
}

pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    handle_line(ctx, line);
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("mdd - type /help for commands, /exit to quit");
    if ctx.auth.is_authenticated() {
        if let Some(user) = ctx.session.current_user() {
            println!("Signed in as {}", user.username);
        }
    }

    loop {
        let prompt = format!("{} > ", ctx.nav.current());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // keep passwords out of history
                if !line.starts_with("/login") && !line.starts_with("/register") {
                    rl.add_history_entry(line)?;
                }
                if handle_line(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Returns true when the user asked to quit
fn handle_line(ctx: &Context, line: &str) -> bool {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Could not parse command: {}", e);
            return false;
        }
    };
    let Some((cmd, args)) = words.split_first() else {
        return false;
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match cmd.as_str() {
        "/exit" | "/quit" => return true,
        "/help" => print_help(),
        "/go" => match args.first().and_then(|p| Route::parse(p)) {
            Some(route) => enter(ctx, route),
            None => println!("Usage: /go <path>  (e.g. /go /articles)"),
        },
        "/login" => login(ctx, &args),
        "/register" => register(ctx, &args),
        "/logout" => {
            ctx.auth.logout();
            ctx.article.borrow_mut().take();
            println!("Logged out");
            enter(ctx, Route::Home);
        }
        "/whoami" => match ctx.session.current_user() {
            Some(user) => println!("{} <{}>", user.username, user.email),
            None => println!("Not signed in"),
        },
        "/articles" => enter(ctx, Route::Articles),
        "/sort" => sort(ctx, args.first().copied()),
        "/article" => match args.first().and_then(|id| id.parse::<i64>().ok()) {
            Some(id) => enter(ctx, Route::Article(id)),
            None => println!("Usage: /article <id>"),
        },
        "/comment" => comment(ctx, &args.join(" ")),
        "/comments" => refresh_comments(ctx),
        "/new" => create_article(ctx, &args),
        "/topics" => enter(ctx, Route::Topics),
        "/subscribe" | "/unsubscribe" => {
            match args.first().and_then(|id| id.parse::<i64>().ok()) {
                Some(id) => change_subscription(ctx, id, cmd == "/subscribe"),
                None => println!("Usage: {} <topic id>", cmd),
            }
        }
        "/profile" => match args.first() {
            Some(&"set") => update_profile(ctx, &args[1..]),
            Some(_) => println!("Usage: /profile [set username=.. email=.. password=..]"),
            None => enter(ctx, Route::Profile),
        },
        _ => println!("Unknown command: {}. Type /help", cmd),
    }
    false
}

fn print_help() {
    println!("Navigation:");
    println!("  /go <path>                 - open a view (/, /login, /register, /articles, /articles/new, /articles/<id>, /topics, /profile)");
    println!("Session:");
    println!("  /login <email> [password]");
    println!("  /register <username> <email> [password]");
    println!("  /logout");
    println!("  /whoami");
    println!("Articles:");
    println!("  /articles                  - list the feed");
    println!("  /sort [asc|desc]           - reorder the loaded feed (toggles without argument)");
    println!("  /article <id>              - open an article and its comments");
    println!("  /comment <text>            - comment on the open article");
    println!("  /comments                  - reload the open article's comments");
    println!("  /new <topicId> <title> <content>");
    println!("Topics:");
    println!("  /topics                    - list topics");
    println!("  /subscribe <id>");
    println!("  /unsubscribe <id>");
    println!("Profile:");
    println!("  /profile                   - show your profile");
    println!("  /profile set username=<u> email=<e> [password=<p>]");
    println!("  /exit");
}

/// Surface an error to the user. An expired session sends them to the login view.
fn report(ctx: &Context, err: &ClientError) {
    tracing::debug!(status = ?err.status(), %err, "command failed");
    if err.invalidates_session() {
        println!("{}", err);
        ctx.article.borrow_mut().take();
        ctx.nav.navigate(Route::Login);
    } else {
        eprintln!("Error: {}", err);
    }
}

/// Navigate (guard first), then load the view's data bound to the new view.
fn enter(ctx: &Context, route: Route) {
    let entered = ctx.nav.navigate(route.clone());
    if entered != route {
        println!("Please log in to open {}", route);
    }
    let view = ctx.nav.token();

    let result = match &entered {
        Route::Home => {
            println!("Welcome to MDD. Use /login or /register, then /articles.");
            Ok(Delivery::Applied)
        }
        Route::Login => {
            println!("Log in with /login <email> [password]");
            Ok(Delivery::Applied)
        }
        Route::Register => {
            println!("Create an account with /register <username> <email> [password]");
            Ok(Delivery::Applied)
        }
        Route::Articles => {
            let delivery = ctx.catalog.borrow_mut().list_articles(&view);
            if let Ok(Delivery::Applied) = delivery {
                print_articles(ctx);
            }
            delivery
        }
        Route::Article(id) => {
            let detail = ctx.catalog.borrow().get_article(*id);
            let delivery = view.deliver(detail, |detail| {
                ctx.comments.borrow_mut().load(&detail);
                *ctx.article.borrow_mut() = Some(detail.article);
            });
            if let Ok(Delivery::Applied) = delivery {
                print_article(ctx);
            }
            delivery
        }
        Route::NewArticle => {
            let delivery = ctx.topics.borrow_mut().list_topics(&view);
            if let Ok(Delivery::Applied) = delivery {
                match ArticleComposer::new(ctx.topics.borrow().topics()) {
                    Ok(composer) => {
                        println!("Choose a topic:");
                        for (id, title) in composer.topics() {
                            println!("  [{}] {}", id, title);
                        }
                        println!("Then: /new <topicId> <title> <content>");
                    }
                    Err(e) => println!("Cannot write an article yet: {}", e.message),
                }
            }
            delivery
        }
        Route::Topics => {
            let delivery = ctx.topics.borrow_mut().list_topics(&view);
            if let Ok(Delivery::Applied) = delivery {
                print_topics(ctx);
            }
            delivery
        }
        Route::Profile => {
            let delivery = ctx
                .profile
                .borrow_mut()
                .get_current_user(&view)
                .and_then(|_| ctx.topics.borrow_mut().list_topics(&view));
            if let Ok(Delivery::Applied) = delivery {
                print_profile(ctx);
            }
            delivery
        }
    };

    match result {
        Ok(Delivery::Applied) => {}
        Ok(Delivery::Discarded) => tracing::debug!(route = %entered, "view left before load finished"),
        Err(e) => report(ctx, &e),
    }
}

fn login(ctx: &Context, args: &[&str]) {
    let Some(email) = args.first() else {
        println!("Usage: /login <email> [password]");
        return;
    };
    let password = match args.get(1) {
        Some(p) => p.to_string(),
        None => match prompt("password: ") {
            Some(p) => p,
            None => return,
        },
    };
    let credentials = Credentials {
        email: email.to_string(),
        password,
    };
    match ctx.auth.login(&credentials) {
        Ok(session) => {
            println!("Welcome back, {}", session.user.username);
            enter(ctx, Route::Articles);
        }
        Err(e) => report(ctx, &e),
    }
}

fn register(ctx: &Context, args: &[&str]) {
    let (Some(username), Some(email)) = (args.first(), args.get(1)) else {
        println!("Usage: /register <username> <email> [password]");
        return;
    };
    let password = match args.get(2) {
        Some(p) => p.to_string(),
        None => match prompt("password: ") {
            Some(p) => p,
            None => return,
        },
    };
    let registration = Registration {
        username: username.to_string(),
        email: email.to_string(),
        password,
    };
    match ctx.auth.register(&registration) {
        Ok(session) => {
            println!("Account created, signed in as {}", session.user.username);
            enter(ctx, Route::Articles);
        }
        Err(e) => report(ctx, &e),
    }
}

fn prompt(label: &str) -> Option<String> {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Input error: {}", e);
            return None;
        }
    };
    rl.readline(label).ok()
}

fn sort(ctx: &Context, arg: Option<&str>) {
    {
        let mut catalog = ctx.catalog.borrow_mut();
        match arg {
            None => {
                catalog.toggle_order();
            }
            Some(s) => match SortOrder::from_str(s) {
                Some(order) => catalog.set_order(order),
                None => {
                    println!("Usage: /sort [asc|desc]");
                    return;
                }
            },
        }
        if !catalog.is_loaded() {
            println!("Sort order: {} (open /articles to load the feed)", catalog.order().as_str());
            return;
        }
    }
    print_articles(ctx);
}

fn comment(ctx: &Context, text: &str) {
    let Route::Article(article_id) = ctx.nav.current() else {
        println!("Open an article first with /article <id>");
        return;
    };
    let posted = ctx
        .comments
        .borrow_mut()
        .submit(article_id, text)
        .map(|c| c.id);
    match posted {
        Ok(id) => println!("Comment #{} posted", id),
        Err(e) => {
            report(ctx, &e);
            if !ctx.comments.borrow().draft().is_empty() {
                println!("Your comment was kept; retry with /comment");
            }
        }
    }
}

fn refresh_comments(ctx: &Context) {
    let Route::Article(article_id) = ctx.nav.current() else {
        println!("Open an article first with /article <id>");
        return;
    };
    let view = ctx.nav.token();
    let delivery = ctx.comments.borrow_mut().refresh(article_id, &view);
    match delivery {
        Ok(Delivery::Applied) => print_article(ctx),
        Ok(Delivery::Discarded) => {}
        Err(e) => report(ctx, &e),
    }
}

fn create_article(ctx: &Context, args: &[&str]) {
    let [topic, title, content @ ..] = args else {
        println!("Usage: /new <topicId> <title> <content>");
        return;
    };
    let Ok(topic_id) = topic.parse::<i64>() else {
        println!("Topic id must be a number");
        return;
    };
    if ctx.nav.current() != Route::NewArticle {
        enter(ctx, Route::NewArticle);
        if ctx.nav.current() != Route::NewArticle {
            return;
        }
    }
    let composer = match ArticleComposer::new(ctx.topics.borrow().topics()) {
        Ok(composer) => composer,
        Err(e) => {
            println!("Cannot write an article yet: {}", e.message);
            return;
        }
    };
    let created = ctx
        .catalog
        .borrow_mut()
        .create_article(&composer, topic_id, title, &content.join(" "));
    match created {
        Ok(article) => {
            println!("Article #{} published", article.id);
            enter(ctx, Route::Articles);
        }
        Err(e) => report(ctx, &e),
    }
}

fn change_subscription(ctx: &Context, topic_id: i64, subscribe: bool) {
    let result = if subscribe {
        ctx.topics.borrow_mut().subscribe(topic_id)
    } else {
        ctx.topics.borrow_mut().unsubscribe(topic_id)
    };
    match result {
        Ok(()) => {
            let verb = if subscribe { "Subscribed to" } else { "Unsubscribed from" };
            match ctx.topics.borrow().find(topic_id) {
                Some(topic) => println!("{} {}", verb, topic.title),
                None => println!("{} topic {}", verb, topic_id),
            }
        }
        Err(e) => report(ctx, &e),
    }
}

fn update_profile(ctx: &Context, assignments: &[&str]) {
    if ctx.nav.current() != Route::Profile {
        enter(ctx, Route::Profile);
        if ctx.nav.current() != Route::Profile {
            return;
        }
    }
    {
        let mut profile = ctx.profile.borrow_mut();
        let form = profile.form_mut();
        for assignment in assignments {
            match assignment.split_once('=') {
                Some(("username", v)) => form.username = v.to_string(),
                Some(("email", v)) => form.email = v.to_string(),
                Some(("password", v)) => form.password = v.to_string(),
                _ => {
                    println!("Unknown field '{}'. Use username=, email= or password=", assignment);
                    return;
                }
            }
        }
    }
    let result = ctx.profile.borrow_mut().update_profile();
    match result {
        Ok(user) => println!("Profile saved ({} <{}>)", user.username, user.email),
        Err(e) => report(ctx, &e),
    }
}

fn print_articles(ctx: &Context) {
    let catalog = ctx.catalog.borrow();
    let articles = catalog.sorted();
    if articles.is_empty() {
        println!("No articles yet. Subscribe to topics in /topics to fill your feed.");
        return;
    }
    println!("Articles ({}):", catalog.order().as_str());
    for article in articles {
        println!(
            "  #{} {} - {} ({})",
            article.id, article.title, article.author, article.created_at
        );
    }
}

fn print_article(ctx: &Context) {
    let article = ctx.article.borrow();
    let Some(article) = article.as_ref() else {
        return;
    };
    println!("{}", article.title);
    println!(
        "{} | {}{}",
        article.created_at,
        article.author,
        article
            .topic_name
            .as_deref()
            .map(|t| format!(" | {}", t))
            .unwrap_or_default()
    );
    println!();
    println!("{}", article.content);
    println!();
    let thread = ctx.comments.borrow();
    println!("Comments ({}):", thread.comments().len());
    for comment in thread.comments() {
        println!("  {} ({}): {}", comment.author_name, comment.created_at, comment.content);
    }
}

fn print_topics(ctx: &Context) {
    let topics = ctx.topics.borrow();
    if topics.topics().is_empty() {
        println!("No topics available");
        return;
    }
    for topic in topics.topics() {
        let marker = if topic.subscribed { " [subscribed]" } else { "" };
        println!("  [{}] {}{}", topic.id, topic.title, marker);
        if !topic.description.is_empty() {
            println!("      {}", topic.description);
        }
    }
}

fn print_profile(ctx: &Context) {
    {
        let profile = ctx.profile.borrow();
        let form = profile.form();
        println!("Username: {}", form.username);
        println!("Email:    {}", form.email);
    }
    let topics = ctx.topics.borrow();
    let subscribed = topics.subscribed_topics();
    println!("Subscriptions ({}):", subscribed.len());
    for topic in subscribed {
        println!("  [{}] {}", topic.id, topic.title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::testing::{anonymous_store, authenticated_store, MockTransport};
    use serde_json::json;

    fn context(mock: &MockTransport, session: Rc<SessionStore>) -> Context {
        let client = Rc::new(ApiClient::new(Box::new(mock.clone()), session.clone()));
        Context {
            session: session.clone(),
            nav: Navigator::new(session),
            auth: AuthGateway::new(client.clone()),
            catalog: RefCell::new(ContentCatalog::new(client.clone(), SortOrder::Desc)),
            topics: RefCell::new(TopicSubscriptionManager::new(client.clone())),
            comments: RefCell::new(CommentThread::new(client.clone())),
            profile: RefCell::new(ProfileManager::new(client)),
            article: RefCell::new(None),
        }
    }

    #[test]
    fn test_protected_view_without_session_makes_no_request() {
        let mock = MockTransport::new();
        let ctx = context(&mock, anonymous_store());

        handle_line(&ctx, "/articles");
        assert_eq!(ctx.nav.current(), Route::Login);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_expired_session_redirects_to_login() {
        let mock = MockTransport::new();
        mock.respond(401, json!({}));
        let session = authenticated_store();
        let ctx = context(&mock, session.clone());

        handle_line(&ctx, "/topics");
        assert!(!session.is_authenticated());
        assert_eq!(ctx.nav.current(), Route::Login);
    }

    #[test]
    fn test_login_then_feed() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            json!({ "token": "t", "user": { "id": 2, "username": "bob", "email": "bob@x.io" } }),
        );
        mock.respond(200, json!([]));
        let ctx = context(&mock, anonymous_store());

        handle_line(&ctx, "/login bob@x.io 'pass word'");
        assert!(ctx.session.is_authenticated());
        assert_eq!(ctx.nav.current(), Route::Articles);
        assert_eq!(mock.requests()[0].body.as_ref().unwrap()["password"], "pass word");
        assert_eq!(mock.requests()[1].path, "/articles");
    }

    #[test]
    fn test_comment_posts_to_open_article() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            json!({
                "article": { "id": 3, "title": "t", "content": "c", "authorName": "a", "createdAt": "2024-09-01" },
                "comments": []
            }),
        );
        mock.respond(
            200,
            json!({ "id": 10, "content": "nice post", "authorName": "ada", "createdAt": "2024-09-02T00:00:00" }),
        );
        let ctx = context(&mock, authenticated_store());

        handle_line(&ctx, "/article 3");
        handle_line(&ctx, "/comment nice post");
        assert_eq!(mock.requests()[1].path, "/articles/3/comments");
        assert_eq!(ctx.comments.borrow().comments()[0].id, 10);
    }

    #[test]
    fn test_logout_goes_home() {
        let mock = MockTransport::new();
        let ctx = context(&mock, authenticated_store());
        handle_line(&ctx, "/logout");
        assert!(!ctx.session.is_authenticated());
        assert_eq!(ctx.nav.current(), Route::Home);
    }

    #[test]
    fn test_exit() {
        let mock = MockTransport::new();
        let ctx = context(&mock, anonymous_store());
        assert!(handle_line(&ctx, "/exit"));
        assert!(!handle_line(&ctx, "/help"));
    }
}
