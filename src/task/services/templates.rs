//! Change request and review link rendering.

use crate::config::ChangeRequestConfig;
use crate::task::domain::FixTask;
use minijinja::{Environment, Value, context};

const TITLE: &str = "title";
const BODY: &str = "body";
const REVIEW_URL: &str = "review_url";

/// Compiled `minijinja` templates for the text a task publishes.
///
/// Templates may reference `instruction`, `branch`, `requester`,
/// `repository` (`owner/name`), `owner`, `name` and `task_id`.
#[derive(Debug, Clone)]
pub struct ChangeRequestTemplates {
    environment: Environment<'static>,
}

/// Rendered change request text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChangeRequest {
    /// Rendered title.
    pub title: String,
    /// Rendered body.
    pub body: String,
}

impl ChangeRequestTemplates {
    /// Compiles the templates from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] when any template fails to parse.
    pub fn from_config(config: &ChangeRequestConfig) -> Result<Self, minijinja::Error> {
        let mut environment = Environment::new();
        environment.add_template_owned(TITLE, config.title_template.clone())?;
        environment.add_template_owned(BODY, config.body_template.clone())?;
        environment.add_template_owned(REVIEW_URL, config.review_url_template.clone())?;
        Ok(Self { environment })
    }

    /// Renders the change request title and body for `task`.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] when rendering fails, for example on an
    /// undefined filter.
    pub fn render(&self, task: &FixTask) -> Result<RenderedChangeRequest, minijinja::Error> {
        let ctx = task_context(task);
        Ok(RenderedChangeRequest {
            title: self.render_named(TITLE, &ctx)?.trim().to_owned(),
            body: self.render_named(BODY, &ctx)?,
        })
    }

    /// Renders the link a reviewer opens to inspect the task's branch.
    ///
    /// # Errors
    ///
    /// Returns a [`minijinja::Error`] when rendering fails.
    pub fn render_review_url(&self, task: &FixTask) -> Result<String, minijinja::Error> {
        Ok(self
            .render_named(REVIEW_URL, &task_context(task))?
            .trim()
            .to_owned())
    }

    fn render_named(&self, name: &str, ctx: &Value) -> Result<String, minijinja::Error> {
        self.environment.get_template(name)?.render(ctx)
    }
}

fn task_context(task: &FixTask) -> Value {
    let repository = task.repository();
    context! {
        instruction => task.instruction().as_str(),
        branch => task.branch_name().as_str(),
        requester => task.requester().as_str(),
        repository => repository.full_name(),
        owner => repository.owner(),
        name => repository.name(),
        task_id => task.id().to_string(),
    }
}
