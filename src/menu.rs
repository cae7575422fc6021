use crate::{
    commands::{AppContext, profile},
    console::{Console, Question},
    error::{AppError, Result},
    storage::DEFAULT_PROFILE,
    validation::{prompt_until_valid, validate_profile_name},
};

pub const BACK_OPTION: &str = "« back";

const LIST: &str = "list profiles";
const CREATE: &str = "create profile";
const DELETE: &str = "delete profile";
const COPY: &str = "copy profile";
const SET_DEFAULT: &str = "set default profile";
const SHOW: &str = "show profile";
const QUIT: &str = "quit";

/// Runs interactive menu interface
pub fn run_menu(ctx: &AppContext, console: &mut dyn Console) -> Result<()> {
    ctx.ensure_structure(console)?;
    loop {
        let actions = [LIST, CREATE, DELETE, COPY, SET_DEFAULT, SHOW, QUIT];
        let action_selected = console.ask(&Question::new("select action").with_choices(actions))?;

        match action_selected.as_str() {
            LIST => profile::list(ctx, console)?,
            CREATE => menu_create(ctx, console)?,
            DELETE => {
                if let Some(name) = select_profile(ctx, console, "select profile to delete:", false)? {
                    profile::delete(ctx, console, &name, false)?;
                }
            }
            COPY => menu_copy(ctx, console)?,
            SET_DEFAULT => {
                if let Some(name) = select_profile(ctx, console, "select default profile:", true)? {
                    profile::set_default(ctx, console, &name)?;
                }
            }
            SHOW => {
                if let Some(name) = select_profile(ctx, console, "select profile to show:", true)? {
                    profile::show(ctx, console, &name)?;
                }
            }
            QUIT => {
                console.warn("quitting");
                break Ok(());
            }
            other => console.error(&format!("unknown action: {other}")),
        }
    }
}

/// Menu for creating a profile
fn menu_create(ctx: &AppContext, console: &mut dyn Console) -> Result<()> {
    let name = prompt_until_valid(console, &Question::new("enter profile name:"), |input| {
        validate_new_name(ctx, input)
    })?;
    let description = console.ask(&Question::new("enter description (optional):"))?;
    let description = Some(description.trim()).filter(|d| !d.is_empty());
    profile::create(ctx, console, &name, description)
}

/// Menu for copying a profile
fn menu_copy(ctx: &AppContext, console: &mut dyn Console) -> Result<()> {
    let Some(source) = select_profile(ctx, console, "select profile to copy:", true)? else {
        return Ok(());
    };
    let destination = prompt_until_valid(
        console,
        &Question::new("enter destination profile name:"),
        |input| validate_new_name(ctx, input),
    )?;
    profile::copy(ctx, console, &source, &destination)
}

/// Profile picker with a trailing back option; `None` when going back
fn select_profile(
    ctx: &AppContext,
    console: &mut dyn Console,
    prompt: &str,
    include_default: bool,
) -> Result<Option<String>> {
    let choices = build_profile_choices(ctx, include_default)?;
    if choices.len() == 1 {
        console.warn("no profiles to select");
        return Ok(None);
    }
    let selected = console.ask(&Question::new(prompt).with_choices(choices))?;
    Ok(Some(selected).filter(|name| name != BACK_OPTION))
}

/// Builds list of profile names for menu to display
pub fn build_profile_choices(ctx: &AppContext, include_default: bool) -> Result<Vec<String>> {
    let mut choices: Vec<String> = ctx
        .store
        .list()?
        .into_iter()
        .map(|profile| profile.name)
        .filter(|name| include_default || name != DEFAULT_PROFILE)
        .collect();
    choices.push(BACK_OPTION.to_string());
    Ok(choices)
}

fn validate_new_name(ctx: &AppContext, input: &str) -> Result<()> {
    validate_profile_name(input).map_err(|e| AppError::Validation(e.to_string()))?;
    if ctx.store.exists(input) {
        return Err(AppError::Validation(format!(
            "profile '{input}' already exists"
        )));
    }
    Ok(())
}
