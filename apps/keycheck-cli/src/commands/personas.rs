use keycheck_client::Operation;
use keycheck_harness::{Expected, PersonaProfile};

fn cell(expected: Option<Expected>) -> String {
    match expected {
        Some(Expected::Status(status)) => status.to_string(),
        Some(Expected::Denied(kind)) => kind.to_string(),
        None => "-".to_string(),
    }
}

pub fn cmd_personas() {
    print!("{:<15}", "persona");
    for op in Operation::ALL {
        print!(" {:<20}", op.as_str());
    }
    println!();

    for profile in PersonaProfile::all() {
        print!("{:<15}", profile.persona.name);
        for op in Operation::ALL {
            print!(" {:<20}", cell(profile.expected(op)));
        }
        println!();
    }
    println!("\n- = not asserted; fixtures are always created as project_admin");
}
