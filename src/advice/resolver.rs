use crate::advice::{AdviceRole, CodeLocator, Dispatcher, DonorProgram, Error, Settings};
use crate::jvm::class_graph::{ClassId, MethodId};
use crate::jvm::{BinaryName, Name};
use crate::util::RefId;

/// Resolved advice of one donor class
///
/// This is built once and then only read: it can be woven into any number of methods.
#[derive(Debug)]
pub struct Advice<'g> {
    /// Class declaring the advice methods
    pub donor: ClassId<'g>,

    pub entry: Dispatcher<'g>,

    /// Exit advice, already bound to whatever value the entry advice produces
    pub exit: Dispatcher<'g>,

    /// Code of the bound advice methods
    pub program: DonorProgram<'g>,

    pub settings: Settings,
}

impl<'g> Advice<'g> {
    /// Find the advice methods declared on a donor class and load their code
    pub fn to(
        donor: ClassId<'g>,
        locator: &dyn CodeLocator<'g>,
        settings: Settings,
    ) -> Result<Advice<'g>, Error> {
        let mut entry: Option<Dispatcher<'g>> = None;
        let mut exit: Option<Dispatcher<'g>> = None;
        for method in donor.0.methods.iter() {
            let method = RefId(method);
            scan_marked(&mut entry, method, &BinaryName::ON_METHOD_ENTER, AdviceRole::Enter)?;
            scan_marked(&mut exit, method, &BinaryName::ON_METHOD_EXIT, AdviceRole::Exit)?;
        }
        if entry.is_none() && exit.is_none() {
            return Err(Error::NoAdviceDefined {
                donor: String::from(donor.name.as_str()),
            });
        }

        let entry = entry.unwrap_or(Dispatcher::Inactive);
        let exit = exit.unwrap_or(Dispatcher::Inactive);
        let exit = exit.bind_to(&entry)?;

        let mut program = DonorProgram::new();
        for bound in [&entry, &exit]
            .into_iter()
            .filter_map(|dispatcher| dispatcher.as_bound())
        {
            let code = locator
                .locate(bound.method)?
                .ok_or_else(|| Error::MissingDonorCode {
                    donor: format!("{:?}", bound.method),
                })?;
            program.insert(bound.method, code);
        }

        log::debug!(
            "Resolved advice in {}: entry = {:?}, exit = {:?}",
            donor.name.as_str(),
            entry.as_bound().map(|bound| bound.method),
            exit.as_bound().map(|bound| bound.method),
        );
        Ok(Advice {
            donor,
            entry,
            exit,
            program,
            settings,
        })
    }
}

/// Bind a method of the donor if it carries the marker annotation
///
/// Each method is checked as soon as it is found, so an invalid advice method is reported even if
/// a later method carries the same marker.
fn scan_marked<'g>(
    found: &mut Option<Dispatcher<'g>>,
    method: MethodId<'g>,
    marker: &BinaryName,
    role: AdviceRole,
) -> Result<(), Error> {
    if method.annotation(marker).is_none() {
        return Ok(());
    }
    if let Some(first) = found.as_ref().and_then(Dispatcher::as_bound) {
        return Err(Error::DuplicateAdvice {
            role,
            first: format!("{:?}", first.method),
            second: format!("{:?}", method),
        });
    }
    *found = Some(Dispatcher::bound(method, role)?);
    Ok(())
}
