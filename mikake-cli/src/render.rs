use colored::Colorize;
use mikake_core::header::optional::{subsystem_name, DATA_DIRECTORY_NAMES};
use mikake_core::{OptionalHeader, ParsedHeader};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct Field {
    #[tabled(rename = "Field")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn field(name: &'static str, value: impl ToString) -> Field {
    Field {
        name,
        value: value.to_string(),
    }
}

fn hex(value: impl Into<u64>) -> String {
    format!("{:#x}", value.into())
}

fn print_table(title: &str, rows: Vec<Field>) {
    println!("\n{}", title.bold().underline());
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

pub fn stub(header: &ParsedHeader) {
    let Some(stub) = &header.stub else {
        println!(
            "\n{} no MZ stub, headers start at offset 0",
            "Stub:".bold()
        );
        return;
    };
    print_table(
        "Stub header",
        vec![
            field("e_magic", hex(stub.e_magic)),
            field("e_cblp", stub.e_cblp),
            field("e_cp", stub.e_cp),
            field("e_crlc", stub.e_crlc),
            field("e_cparhdr", stub.e_cparhdr),
            field("e_minalloc", hex(stub.e_minalloc)),
            field("e_maxalloc", hex(stub.e_maxalloc)),
            field("e_ss", hex(stub.e_ss)),
            field("e_sp", hex(stub.e_sp)),
            field("e_csum", hex(stub.e_csum)),
            field("e_ip", hex(stub.e_ip)),
            field("e_cs", hex(stub.e_cs)),
            field("e_lfarlc", hex(stub.e_lfarlc)),
            field("e_ovno", stub.e_ovno),
            field("e_oemid", stub.e_oemid),
            field("e_oeminfo", stub.e_oeminfo),
            field("e_lfanew", hex(stub.e_lfanew)),
        ],
    );
}

pub fn file_header(header: &ParsedHeader) {
    let fh = &header.file_header;
    let signature = if header.signature.valid {
        "PE\\0\\0".green().to_string()
    } else {
        format!("{:02x?}", header.signature.bytes).red().to_string()
    };
    print_table(
        "File header",
        vec![
            field("Header base", hex(header.base)),
            field("Signature", signature),
            field("Machine", fh.machine),
            field("Sections", fh.number_of_sections),
            field("Timestamp", format!("{} ({:#x})", fh.time_date_stamp, fh.time_date_stamp)),
            field("Symbol table", hex(fh.pointer_to_symbol_table)),
            field("Symbols", fh.number_of_symbols),
            field("Optional header size", fh.size_of_optional_header),
            field("Characteristics", hex(fh.characteristics)),
        ],
    );
}

pub fn optional_header(header: &ParsedHeader) {
    let rows = match &header.optional_header {
        OptionalHeader::Pe32(oh) => vec![
            field("Magic", format!("{:#x} (PE32)", oh.magic)),
            field(
                "Linker",
                format!("{}.{}", oh.major_linker_version, oh.minor_linker_version),
            ),
            field("Size of code", hex(oh.size_of_code)),
            field("Entry point", hex(oh.address_of_entry_point)),
            field("Base of code", hex(oh.base_of_code)),
            field("Base of data", hex(oh.base_of_data)),
            field("Image base", hex(oh.image_base)),
            field("Section alignment", hex(oh.section_alignment)),
            field("File alignment", hex(oh.file_alignment)),
            field(
                "OS version",
                format!(
                    "{}.{}",
                    oh.major_operating_system_version, oh.minor_operating_system_version
                ),
            ),
            field("Size of image", hex(oh.size_of_image)),
            field("Size of headers", hex(oh.size_of_headers)),
            field("Checksum", hex(oh.check_sum)),
            field(
                "Subsystem",
                format!("{} ({})", subsystem_name(oh.subsystem), oh.subsystem),
            ),
            field("DLL characteristics", hex(oh.dll_characteristics)),
            field("Stack reserve", hex(oh.size_of_stack_reserve)),
            field("Stack commit", hex(oh.size_of_stack_commit)),
            field("Heap reserve", hex(oh.size_of_heap_reserve)),
            field("Heap commit", hex(oh.size_of_heap_commit)),
            field("RVA and sizes", oh.number_of_rva_and_sizes),
        ],
        OptionalHeader::Pe32Plus(oh) => vec![
            field("Magic", format!("{:#x} (PE32+)", oh.magic)),
            field(
                "Linker",
                format!("{}.{}", oh.major_linker_version, oh.minor_linker_version),
            ),
            field("Size of code", hex(oh.size_of_code)),
            field("Entry point", hex(oh.address_of_entry_point)),
            field("Base of code", hex(oh.base_of_code)),
            field("Image base", hex(oh.image_base)),
            field("Section alignment", hex(oh.section_alignment)),
            field("File alignment", hex(oh.file_alignment)),
            field(
                "OS version",
                format!(
                    "{}.{}",
                    oh.major_operating_system_version, oh.minor_operating_system_version
                ),
            ),
            field("Size of image", hex(oh.size_of_image)),
            field("Size of headers", hex(oh.size_of_headers)),
            field("Checksum", hex(oh.check_sum)),
            field(
                "Subsystem",
                format!("{} ({})", subsystem_name(oh.subsystem), oh.subsystem),
            ),
            field("DLL characteristics", hex(oh.dll_characteristics)),
            field("Stack reserve", hex(oh.size_of_stack_reserve)),
            field("Stack commit", hex(oh.size_of_stack_commit)),
            field("Heap reserve", hex(oh.size_of_heap_reserve)),
            field("Heap commit", hex(oh.size_of_heap_commit)),
            field("RVA and sizes", oh.number_of_rva_and_sizes),
        ],
        OptionalHeader::Absent => {
            println!("\n{} none decoded", "Optional header:".bold());
            return;
        }
    };
    print_table("Optional header", rows);
}

#[derive(Tabled)]
struct DirectoryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Directory")]
    name: &'static str,
    #[tabled(rename = "RVA")]
    rva: String,
    #[tabled(rename = "Size")]
    size: String,
}

pub fn directories(header: &ParsedHeader) {
    let Some(dirs) = header.optional_header.data_directories() else {
        println!("No data directories (optional header absent).");
        return;
    };
    let rows: Vec<DirectoryRow> = dirs
        .iter()
        .zip(DATA_DIRECTORY_NAMES)
        .enumerate()
        .filter(|(_, (dir, _))| dir.is_present())
        .map(|(index, (dir, name))| DirectoryRow {
            index,
            name,
            rva: hex(dir.virtual_address),
            size: hex(dir.size),
        })
        .collect();

    if rows.is_empty() {
        println!("All data directories are empty.");
        return;
    }
    println!("\n{}", "Data directories".bold().underline());
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

pub fn flags(header: &ParsedHeader) {
    let c = &header.classification;
    let names = c.flag_names();
    println!(
        "\n{} {}  {}",
        "Role:".bold(),
        c.role().cyan().bold(),
        if names.is_empty() {
            "(no flags)".dimmed().to_string()
        } else {
            names.join(" | ")
        }
    );
    if c.is_dll && c.is_system_file {
        println!("{}", "note: both DLL and SYSTEM bits are set".yellow());
    }
}

pub fn warnings(header: &ParsedHeader) {
    for warning in &header.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
}
